use aeri::{bootstrap, BootstrapOptions, Handler, HttpContext, HttpRouteConfig, Json, LogicBlock};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn std::error::Error>> {
    let greetings = LogicBlock::named("greetings")
        .handler("hello", Handler::sync(|| json!({ "message": "Hello, world!" })))
        .handler("greet", |ctx: HttpContext| async move {
            let name = ctx.param("name").unwrap_or("stranger").to_string();
            Json(json!({ "message": format!("Hello, {name}!") }))
        })
        .route("hello", HttpRouteConfig::get("/hello"))
        .route("greet", HttpRouteConfig::get("/greet/:name"));

    let mut app = bootstrap(BootstrapOptions::new().logic(greetings)).await?;
    app.wait().await;
    Ok(())
}

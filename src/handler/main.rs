use lambda_http::{run, service_fn, Error, Request};
use slack_ticket_handler::{App, Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    let app = App::from_config(&config)?;
    let app = &app;

    run(service_fn(move |event: Request| async move { app.handle(event).await })).await
}

use std::error::Error;

use actix_web::{web, App, HttpServer};
use course_service::api::{self, request_id::RequestIdHeader};
use course_service::Context;
use service_core::telemetry::logging::{init_subscriber, make_subscriber};
use tracing_actix_web::TracingLogger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = make_subscriber("course_service", "info");
    init_subscriber(subscriber)?;

    let ctx = Context::from_env().await?;
    let bind_address = ctx.bind_address.clone();
    tracing::info!(%bind_address, currency = %ctx.currency, "Starting course service.");

    let ctx = web::Data::new(ctx);
    HttpServer::new(move || {
        App::new()
            .app_data(ctx.clone())
            .wrap(RequestIdHeader)
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use retreat_booking::{
    config::Config,
    configure_routes,
    services::{database::DatabaseService, orders::OrderServiceClient},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().expect("Failed to load configuration");

    let database_service = DatabaseService::new(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let order_client = OrderServiceClient::new(config.order_service.clone())
        .expect("Failed to build order service client");

    let app_config = config.app.clone();
    let bind_address = format!("0.0.0.0:{}", config.port);

    log::info!("Starting retreat booking server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials(),
            )
            .app_data(web::Data::new(database_service.clone()))
            .app_data(web::Data::new(order_client.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

pub mod alert_routes;
pub mod service_check_routes;

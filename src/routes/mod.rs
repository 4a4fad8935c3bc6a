pub mod data_routes;
pub mod info_routes;
pub mod live_ws;

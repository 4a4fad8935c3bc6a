pub mod traffic_client;

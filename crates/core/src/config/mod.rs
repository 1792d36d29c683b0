pub mod demo_config;

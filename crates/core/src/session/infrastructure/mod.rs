pub mod background_loader;

//! Main application entry point.

fn main() {
    env_logger::init();
    log::info!("Starting LimbLink");

    limblink_app::App::run();
}

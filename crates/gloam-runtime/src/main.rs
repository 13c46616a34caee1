use clap::Parser;
use gloam_client::cli::CliArgs;
use gloam_client::engine::Engine;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    tracing::info!("gloam v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let event_loop = match winit::event_loop::EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("Error: failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut engine = Engine::new(config, args.shaders.clone());
    if let Err(e) = event_loop.run_app(&mut engine) {
        eprintln!("Error: event loop: {}", e);
        std::process::exit(1);
    }
    if let Some(message) = engine.failure() {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod adc;
mod api;
mod clock;
mod config;
mod error;
mod indicator;
mod measure;
mod monitoring;
mod service;
mod storage;

use adc::serial::SerialAdc;
use clock::SystemClock;
use config::Cli;
use indicator::StateIndicator;
use measure::PowerMeter;
use service::data_loop::DataProcessingLoop;
use service::measurement_loop::MeasurementTask;
use service::state::create_shared_state;
use storage::CsvRecorder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with colors and stderr output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "power_meter_service=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Handle --list-ports
    if cli.list_ports {
        list_serial_ports();
        return Ok(());
    }

    // Require a mode if not listing ports
    let Some(adc_config) = cli.to_adc_source_config() else {
        eprintln!("Error: Please specify a mode (serial, playback or simulate)");
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    };

    let meter_config = cli.to_meter_config()?;

    tracing::info!(
        "Starting power meter service on {}:{}",
        cli.host,
        cli.listen
    );
    tracing::info!(
        "{} samples x {} windows per measurement, range shift below {:.2} A",
        meter_config.samples_per_window,
        meter_config.num_windows,
        meter_config.shift_threshold()
    );

    // Create shared state
    let state = create_shared_state();

    // Resume the recording session saved before the last shutdown
    let recorder = CsvRecorder::open(&cli.data_dir).await?;
    let restored = recorder.restore_session().await?;
    {
        let mut s = state.write().await;
        if let Some(session) = &restored {
            tracing::info!("Resuming recording session {}", session);
        }
        s.active_session = restored;
        s.monitoring_api_url = cli.monitoring_url.clone();
        s.meter_id = cli.meter_id.clone();
    }

    // Create the meter on the selected ADC back-end
    let adc = adc_config.create_reader(&meter_config)?;
    let meter = PowerMeter::new(adc, meter_config)?;

    let mut measurement_task = MeasurementTask::new(cli.interval(), Arc::new(SystemClock));
    let event_rx = measurement_task.start(meter);

    // Create and spawn data processing loop
    let indicator = Arc::new(StateIndicator::new(state.clone()));
    let processing_loop = DataProcessingLoop::new(state.clone(), recorder.clone(), indicator)?;

    let processing_handle = tokio::spawn(async move {
        if let Err(e) = processing_loop.run(event_rx).await {
            tracing::error!("Data processing loop error: {}", e);
        }
    });

    // Create and run HTTP server
    let router = api::create_router(state, recorder);
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.listen).parse()?;

    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup; dropping the receiver releases a task blocked on a full channel
    tracing::info!("Shutting down...");
    processing_handle.abort();
    let _ = processing_handle.await;
    if measurement_task.is_active() {
        tracing::info!("Stopping measurement task");
    }
    if let Err(e) = measurement_task.stop().await {
        tracing::warn!("Measurement task ended with error: {}", e);
    }

    Ok(())
}

/// List available serial ports
fn list_serial_ports() {
    match SerialAdc::list_available_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                println!("No serial ports found");
            } else {
                println!("Available serial ports:");
                for port in ports {
                    let port_type = match port.port_type {
                        serialport::SerialPortType::UsbPort(info) => {
                            format!(
                                "USB - {}",
                                info.product.unwrap_or_else(|| "Unknown".to_string())
                            )
                        }
                        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                        serialport::SerialPortType::PciPort => "PCI".to_string(),
                        serialport::SerialPortType::Unknown => "Unknown".to_string(),
                    };
                    println!("  {} - {}", port.port_name, port_type);
                }
            }
        }
        Err(e) => {
            eprintln!("Error listing serial ports: {}", e);
        }
    }
}

/// Wait for shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

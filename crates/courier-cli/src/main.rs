use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courier_core::app::{
    Courier, CourierBuilder, InboundRouting, Interest, register_interest, route_inbound,
};
use courier_core::config::CourierConfig;
use courier_core::domain::{
    CorrelationKey, CorrelatorId, Element, ExchangeId, ExchangePattern, InstanceId, Message,
    MessageExchange, ServiceDefinition,
};
use courier_core::ports::{ExchangeStore, ServiceRegistry};

#[derive(Debug, Parser)]
#[command(name = "courier", about = "Message coordinator for long-running processes")]
struct Cli {
    /// JSON config file (COURIER_* env vars override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON array of service definitions
    #[arg(long, global = true)]
    services: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve the service and operation for an inbound address
    Resolve {
        #[arg(long)]
        to: String,
        #[arg(long)]
        action: Option<String>,
        /// first Body element, as XML
        #[arg(long)]
        payload: Option<String>,
    },
    /// Walk an inbound message and a registration through one correlator
    Correlate {
        #[arg(long, default_value = "demo.order")]
        correlator: String,
        #[arg(long, default_value = "42")]
        key: String,
        /// register the instance before the message arrives
        #[arg(long)]
        register_first: bool,
    },
    /// Invoke an operation on a partner port and print the reply
    Invoke {
        #[arg(long)]
        service: String,
        #[arg(long)]
        port: String,
        #[arg(long)]
        operation: String,
        /// `<message>` element with one child per part
        #[arg(long)]
        request: String,
        /// roll the caller transaction back instead of committing it
        #[arg(long)]
        rollback: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<CourierConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => CourierConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CourierConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn load_services(path: Option<&Path>) -> Result<Vec<ServiceDefinition>, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(Vec::new()),
    }
}

fn resolve(
    courier: &Courier,
    to: &str,
    action: Option<&str>,
    payload: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let payload = payload.map(Element::parse).transpose()?;
    let (service, operation) = courier
        .dispatcher()
        .resolve(to, action, payload.as_ref())?;
    println!("service={} operation={}", service.name, operation);
    Ok(())
}

fn correlate(courier: &Courier, correlator: &str, key: &str, register_first: bool) {
    let id = CorrelatorId::new(correlator);
    let key = CorrelationKey::new([key]);
    let instance = InstanceId::generate();
    let message = ExchangeId::generate();

    let correlators = courier.correlators();
    let register = || {
        correlators.with_correlator(&id, |c| {
            register_interest(c, "receive-1", instance, 0, Some(key.clone()))
        })
    };
    let arrive = || {
        correlators.with_correlator(&id, |c| route_inbound(c, message, vec![key.clone()]))
    };

    if register_first {
        let interest = register();
        let routing = arrive();
        println!("registration: {interest:?}");
        match routing {
            InboundRouting::Matched { route, .. } => {
                println!("message {message} routed to instance {}", route.target)
            }
            InboundRouting::Queued => println!("message {message} queued"),
        }
        let removed = correlators.discard_instance(instance);
        println!("instance {instance} discarded, {removed} route(s) removed");
    } else {
        let routing = arrive();
        println!("arrival: {routing:?}");
        match register() {
            Interest::Delivered(delivered) => {
                println!("instance {instance} received queued message {delivered}")
            }
            Interest::Waiting => println!("instance {instance} is waiting"),
        }
    }

    for stats in courier.correlator_stats() {
        println!(
            "correlator={} queued={} routes={}",
            stats.correlator, stats.queued_messages, stats.routes
        );
    }
}

async fn invoke(
    courier: &Courier,
    service: &str,
    port: &str,
    operation: &str,
    request: &str,
    rollback: bool,
) -> Result<(), Box<dyn Error>> {
    let external = courier.external_service(service, port)?;
    let definition = courier
        .registry()
        .service(service)
        .ok_or_else(|| format!("service '{service}' is not registered"))?;
    let op = definition
        .operation(operation)
        .ok_or_else(|| format!("operation '{operation}' is not defined on {service}"))?;
    let pattern = if op.is_one_way() {
        ExchangePattern::OneWay
    } else {
        ExchangePattern::RequestResponse
    };
    let request = Message::from_element(op.input.name.clone(), Element::parse(request)?);
    let mut exchange = MessageExchange::new(operation, pattern, request);
    let id = exchange.id();

    let tx = courier.scheduler().begin();
    external.invoke(&tx, &mut exchange)?;
    if rollback {
        tx.rollback();
    } else {
        tx.commit();
    }
    info!(mex = %id, "caller transaction finished");

    // キュー済みの呼び出しを流し切ってから結果を読む
    courier.shutdown().await;
    external.close();
    let Some(exchange) = courier.store().lookup(id) else {
        warn!(mex = %id, "exchange not found after shutdown");
        return Ok(());
    };
    println!("state={:?}", exchange.state());
    if let Some(fault) = exchange.fault() {
        println!("fault={fault}");
    }
    if let Some(response) = exchange.response() {
        println!("response={}", response.root());
    }
    if let Some(err) = exchange.outcome_error() {
        println!("error kind={:?}: {err}", err.kind());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let mut builder = CourierBuilder::new().with_config(config);
    for service in load_services(cli.services.as_deref())? {
        builder = builder.register_service(service)?;
    }
    let courier = builder.build()?;
    info!(
        services = courier.registry().len(),
        workers = courier.config().worker_count,
        "courier started"
    );

    match cli.command {
        Command::Resolve { to, action, payload } => {
            resolve(&courier, &to, action.as_deref(), payload.as_deref())?
        }
        Command::Correlate {
            correlator,
            key,
            register_first,
        } => correlate(&courier, &correlator, &key, register_first),
        Command::Invoke {
            service,
            port,
            operation,
            request,
            rollback,
        } => return invoke(&courier, &service, &port, &operation, &request, rollback).await,
    }

    courier.shutdown().await;
    Ok(())
}

//! Entry point for pgtop. Parses args, sets up logging and runs either the
//! terminal view or the batch printer.

mod app;
mod batch;
mod demo;
mod settings;
mod ui;
mod view;

use anyhow::{bail, Context, Result};
use app::App;
use demo::DemoSource;
use pgtop_engine::{
    order_index, DataSource, EngineConfig, FullCmd, JsonSnapshotSource, Mode, Monitor,
    ProcessSelection,
};
use settings::{config_dir, load_settings, Settings};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use view::View;

const USAGE: &str = "Usage: pgtop [--rows FILE | --demo] [-d|--delay SECS] [-o|--order NAME] \
[-u|--user NAME] [-i|--hide-idle] [-c|--cmdline] [-Q|--query-text] [-R|--replication] [-I|--io] \
[-r|--remote] [-b|--batch] [-n|--iterations N]

Orders: cpu size res xtime qtime iops iorps iowps reads writes locks command flag rlag slag wlag
Keys: q quit, space refresh, o next order, P/M/T cpu/size/xtime, i idle, c command mode,
      I io layout, R replication";

#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    rows: Option<PathBuf>,
    demo: bool,
    delay: Option<f64>,
    order: Option<String>,
    user: Option<String>,
    hide_idle: bool,
    full_cmd: Option<FullCmd>,
    replication: bool,
    io: bool,
    remote: bool,
    batch: bool,
    iterations: Option<u64>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut p = ParsedArgs::default();

    fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
        it.next()
            .ok_or_else(|| format!("{flag} needs a value\n{USAGE}"))
    }

    while let Some(arg) = it.next() {
        // --flag=value form
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut take = |name: &str| match inline.clone() {
            Some(v) => Ok(v),
            None => value(&mut it, name),
        };
        match flag.as_str() {
            "-h" | "--help" => return Err(USAGE.to_string()),
            "--rows" => p.rows = Some(PathBuf::from(take("--rows")?)),
            "--demo" => p.demo = true,
            "-d" | "--delay" => {
                let v = take("--delay")?;
                p.delay = Some(
                    v.parse::<f64>()
                        .ok()
                        .filter(|d| *d > 0.0)
                        .ok_or_else(|| format!("invalid delay {v:?}\n{USAGE}"))?,
                );
            }
            "-o" | "--order" => p.order = Some(take("--order")?),
            "-u" | "--user" => p.user = Some(take("--user")?),
            "-n" | "--iterations" => {
                let v = take("--iterations")?;
                p.iterations = Some(
                    v.parse()
                        .map_err(|_| format!("invalid iteration count {v:?}\n{USAGE}"))?,
                );
            }
            "-i" | "--hide-idle" => p.hide_idle = true,
            "-c" | "--cmdline" => p.full_cmd = Some(FullCmd::ProcessTable),
            "-Q" | "--query-text" => p.full_cmd = Some(FullCmd::QueryText),
            "-R" | "--replication" => p.replication = true,
            "-I" | "--io" => p.io = true,
            "-r" | "--remote" => p.remote = true,
            "-b" | "--batch" => p.batch = true,
            _ => return Err(format!("Unexpected argument {arg:?}.\n{USAGE}")),
        }
    }
    Ok(p)
}

/// Settings file first, then flags.
fn build_view(settings: &Settings, args: &ParsedArgs) -> Result<View> {
    let order_name = args.order.as_deref().unwrap_or(&settings.order);
    let Some(order) = order_index(order_name) else {
        bail!("unknown sort order {order_name:?}");
    };
    Ok(View {
        selection: ProcessSelection {
            show_idle: settings.show_idle && !args.hide_idle,
            username: args.user.clone().unwrap_or_else(|| settings.user.clone()),
            full_cmd: args.full_cmd.unwrap_or(settings.full_cmd),
        },
        mode: if args.replication {
            Mode::Replication
        } else {
            Mode::Normal
        },
        io: args.io,
        order,
        delay: Duration::from_secs_f64(args.delay.unwrap_or(settings.delay_secs).max(0.1)),
    })
}

/// Logs go to `PGTOP_LOG`-filtered stderr in batch mode; the terminal view
/// owns the screen, so there they go to a file in the config dir.
fn init_logging(batch: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env("PGTOP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if batch {
        builder.with_writer(std::io::stderr).init();
    } else {
        let dir = config_dir();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("pgtop.log"))
            .context("opening log file")?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    init_logging(parsed.batch)?;

    let settings = load_settings();
    let view = build_view(&settings, &parsed)?;

    let mut config = EngineConfig::from_env().context("reading engine settings")?;
    config.remote |= parsed.remote;
    let procfs_root = config.procfs_root.clone();
    let mut monitor = Monitor::new(config).context("starting monitor")?;
    info!(host = %monitor.statics().hostname, "monitor ready");

    let mut source: Box<dyn DataSource> = match (&parsed.rows, parsed.demo) {
        (Some(path), _) => Box::new(JsonSnapshotSource::new(path)),
        (None, true) => Box::new(DemoSource::new(procfs_root)),
        (None, false) => bail!("no row source: pass --rows FILE or --demo\n{USAGE}"),
    };

    if parsed.batch {
        batch::run(&mut monitor, source.as_mut(), &view, parsed.iterations).await
    } else {
        App::new(view).run(&mut monitor, source.as_mut()).await
    }
}

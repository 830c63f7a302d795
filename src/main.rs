use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use num_bigint::{BigInt, Sign};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;

use plc::environment::Environment;

/// A timer that writes nothing, keeping compact log lines short.
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

fn init_tracing() {
    // PLC_LOG_STYLE: "compact" (default) or "full" (timestamps included)
    let Ok(filter) = EnvFilter::try_from_env("PLC_LOG") else {
        return;
    };
    let style = std::env::var("PLC_LOG_STYLE").unwrap_or_default();
    if style == "full" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_timer(NoTimestamp)
            .with_writer(io::stderr)
            .init();
    }
    tracing::debug!("tracing initialized");
}

/// Low 32 bits of `value` in two's complement.
fn exit_code(value: &BigInt) -> i32 {
    let fill = if value.sign() == Sign::Minus { 0xff } else { 0 };
    let mut low = [fill; 4];
    for (slot, byte) in low.iter_mut().zip(value.to_signed_bytes_le()) {
        *slot = byte;
    }
    i32::from_le_bytes(low)
}

fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let mut backend_name = "interpreter".to_string();
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--backend" | "-b" => {
                backend_name = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing backend name after {arg}"))?;
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = &input_path {
        fs::read_to_string(path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };
    let name = input_path.as_deref().unwrap_or("<stdin>");
    let environment = Environment::standard();

    match backend_name.as_str() {
        "interpreter" => {
            let execution = plc::run_source_in(&environment, &source)
                .with_context(|| format!("Running {name}"))?;
            for line in &execution.output {
                println!("{line}");
            }
            std::process::exit(exit_code(&execution.value));
        }
        "emitter" => {
            let output = plc::emit_source_in(&environment, &source)
                .with_context(|| format!("Emitting {name}"))?;
            print!("{output}");
            Ok(())
        }
        _ => bail!("Unknown backend '{backend_name}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_keep_the_low_32_bits() {
        assert_eq!(exit_code(&BigInt::from(0)), 0);
        assert_eq!(exit_code(&BigInt::from(42)), 42);
        assert_eq!(exit_code(&BigInt::from(-1)), -1);
        assert_eq!(exit_code(&BigInt::from(i32::MIN)), i32::MIN);
        assert_eq!(exit_code(&BigInt::from(1_i64 << 32)), 0);
        assert_eq!(exit_code(&BigInt::from((1_i64 << 32) + 7)), 7);
    }
}

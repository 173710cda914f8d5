// Licensed under the Apache-2.0 license

use anyhow::{bail, Context, Result};
use log::info;
use pal_os::{thread, TimerKind, TimerService, TimerServiceConfig};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Timer requested on the command line as `NAME:PERIOD_MS[:periodic]`.
#[derive(Debug, Clone)]
pub struct TimerSpec {
    pub name: String,
    pub period_ms: u64,
    pub kind: TimerKind,
}

impl FromStr for TimerSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let name = match parts.next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => bail!("timer '{}' has no name", s),
        };
        let period_ms = parts
            .next()
            .with_context(|| format!("timer '{}' has no period", s))?
            .parse::<u64>()
            .with_context(|| format!("timer '{}' has an invalid period", s))?;
        let kind = match parts.next() {
            None | Some("oneshot") => TimerKind::OneShot,
            Some("periodic") => TimerKind::Periodic,
            Some(other) => bail!("unknown timer kind '{}'", other),
        };
        if parts.next().is_some() {
            bail!("timer '{}' has trailing fields", s);
        }
        Ok(Self {
            name,
            period_ms,
            kind,
        })
    }
}

fn start_service() -> Result<TimerService> {
    let service = TimerService::with_config(TimerServiceConfig {
        thread_name: "demo-timer".to_string(),
        ..Default::default()
    });
    service.init().context("Failed to start timer service")?;
    Ok(service)
}

pub fn oneshot(period_ms: u64, wait_ms: u64) -> Result<()> {
    let service = start_service()?;
    let start = Instant::now();
    let timer = service
        .create("oneshot", TimerKind::OneShot, period_ms, true, move || {
            info!("oneshot fired after {} ms", start.elapsed().as_millis());
        })
        .context("Failed to create timer")?;

    thread::sleep(wait_ms);
    info!("timer active after wait: {}", timer.is_active());
    timer.delete()?;
    service.deinit()?;
    Ok(())
}

pub fn periodic(period_ms: u64, duration_ms: u64) -> Result<()> {
    let service = start_service()?;
    let fired = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let count = Arc::clone(&fired);
    let timer = service
        .create("periodic", TimerKind::Periodic, period_ms, true, move || {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            info!("tick {} at {} ms", n, start.elapsed().as_millis());
        })
        .context("Failed to create timer")?;

    thread::sleep(duration_ms);
    timer.stop()?;
    info!(
        "{} expiries in {} ms (period {} ms)",
        fired.load(Ordering::SeqCst),
        duration_ms,
        period_ms
    );
    service.deinit()?;
    Ok(())
}

pub fn schedule(specs: &[TimerSpec], duration_ms: u64) -> Result<()> {
    let service = start_service()?;
    let log = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    let mut timers = Vec::with_capacity(specs.len());
    for spec in specs {
        let log = Arc::clone(&log);
        let name = spec.name.clone();
        let timer = service
            .create(&spec.name, spec.kind, spec.period_ms, false, move || {
                if let Ok(mut log) = log.lock() {
                    log.push((start.elapsed().as_millis(), name.clone()));
                }
            })
            .with_context(|| format!("Failed to create timer '{}'", spec.name))?;
        timers.push(timer);
    }
    for timer in &timers {
        timer.start()?;
    }
    info!("armed: {:?}", service.armed_timers()?);

    thread::sleep(duration_ms);
    service.deinit()?;

    let log = log
        .lock()
        .map_err(|_| anyhow::anyhow!("fire log poisoned"))?;
    for (at, name) in log.iter() {
        println!("{:>6} ms  {}", at, name);
    }
    Ok(())
}

//! Throughput benchmark.
//!
//! Populates `records` accounts, then keeps `concurrency` operations in
//! flight until `ops` have completed. Each operation is drawn uniformly from
//! a read, a data modify, a password change and an insert, so half of the
//! traffic goes through the write queue. Per-second rates are printed every
//! `sample_secs` seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::info;
use userdb_core::storage::{MemoryEngine, SledEngine};
use userdb_core::{AccountStore, UserDbError};

use crate::app::AppContext;
use crate::cli::BenchArgs;
use crate::constants::bench;
use crate::errors::CliError;
use crate::ui::{status, ProgressBar, Status, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BenchOp {
    Read,
    Modify,
    ChangePassword,
    Insert,
}

impl BenchOp {
    const ALL: [BenchOp; 4] = [
        BenchOp::Read,
        BenchOp::Modify,
        BenchOp::ChangePassword,
        BenchOp::Insert,
    ];

    fn pick<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Validated benchmark parameters.
#[derive(Debug, Clone)]
struct BenchPlan {
    records: u64,
    concurrency: u32,
    ops: u64,
    sample: Duration,
}

impl BenchPlan {
    fn from_args(args: &BenchArgs) -> anyhow::Result<Self> {
        let concurrency = u32::try_from(args.concurrency)
            .ok()
            .filter(|c| *c > 0 && (*c as usize) <= Semaphore::MAX_PERMITS)
            .ok_or_else(|| {
                CliError::invalid_input(format!(
                    "--concurrency must be between 1 and {}",
                    u32::MAX
                ))
            })?;
        if args.sample_secs == 0 {
            return Err(CliError::invalid_input("--sample-secs must be at least 1").into());
        }
        Ok(Self {
            records: args.records as u64,
            concurrency,
            ops: args.ops,
            sample: Duration::from_secs(args.sample_secs),
        })
    }
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    modifies: AtomicU64,
    change_passwords: AtomicU64,
    inserts: AtomicU64,
    ops: AtomicU64,
    errs: AtomicU64,
}

impl Counters {
    fn record(&self, op: BenchOp, ok: bool) {
        let counter = match op {
            BenchOp::Read => &self.reads,
            BenchOp::Modify => &self.modifies,
            BenchOp::ChangePassword => &self.change_passwords,
            BenchOp::Insert => &self.inserts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.errs.fetch_add(1, Ordering::Relaxed);
        }
        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            reads: self.reads.load(Ordering::Relaxed),
            modifies: self.modifies.load(Ordering::Relaxed),
            change_passwords: self.change_passwords.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            ops: self.ops.load(Ordering::Relaxed),
            errs: self.errs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Snapshot {
    reads: u64,
    modifies: u64,
    change_passwords: u64,
    inserts: u64,
    ops: u64,
    errs: u64,
}

impl Snapshot {
    fn since(&self, earlier: &Snapshot) -> Snapshot {
        Snapshot {
            reads: self.reads.saturating_sub(earlier.reads),
            modifies: self.modifies.saturating_sub(earlier.modifies),
            change_passwords: self.change_passwords.saturating_sub(earlier.change_passwords),
            inserts: self.inserts.saturating_sub(earlier.inserts),
            ops: self.ops.saturating_sub(earlier.ops),
            errs: self.errs.saturating_sub(earlier.errs),
        }
    }

    fn rates_line(&self, secs: f64) -> String {
        let rate = |count: u64| count as f64 / secs;
        format!(
            "reads: {:.0}/s changePasswords: {:.0}/s inserts: {:.0}/s modifies: {:.0}/s total ops: {:.0}/s errs: {:.0}/s",
            rate(self.reads),
            rate(self.change_passwords),
            rate(self.inserts),
            rate(self.modifies),
            rate(self.ops),
            rate(self.errs),
        )
    }

    fn totals_line(&self) -> String {
        format!(
            "total reads: {} changePasswords: {} inserts: {} modifies: {} ops: {} errs: {}",
            self.reads, self.change_passwords, self.inserts, self.modifies, self.ops, self.errs
        )
    }
}

fn bench_email(index: u64) -> String {
    format!("{}-{}", index, bench::BASE_EMAIL)
}

pub async fn handle_bench(ctx: &AppContext<'_>, args: &BenchArgs) -> anyhow::Result<()> {
    let plan = BenchPlan::from_args(args)?;
    let quiet = ctx.quiet();
    let store = Arc::new(open_bench_store(ctx, args)?);

    if !quiet {
        println!("Populating store with {} accounts", plan.records);
    }
    let started = Instant::now();
    populate(&store, plan.records, quiet).await?;
    let elapsed = started.elapsed().as_secs_f64();
    if !quiet {
        println!(
            "Populated {} accounts in {:.2}s [{:.0} add_user/s]",
            plan.records,
            elapsed,
            plan.records as f64 / elapsed.max(f64::EPSILON)
        );
        let term = Terminal::detect(false);
        println!(
            "{}",
            status(
                &term,
                Status::Note,
                &format!(
                    "Starting benchmark: {} ops at concurrency {}",
                    plan.ops, plan.concurrency
                )
            )
        );
    }

    let started = Instant::now();
    let totals = run_workload(Arc::clone(&store), &plan, quiet).await?;
    let elapsed = started.elapsed().as_secs_f64();
    store.close().await?;

    info!(ops = totals.ops, errs = totals.errs, elapsed_secs = elapsed, "Benchmark completed");
    if !quiet {
        println!("Benchmark completed in {:.2}s", elapsed);
    }
    println!("{}", totals.totals_line());
    Ok(())
}

fn open_bench_store(ctx: &AppContext<'_>, args: &BenchArgs) -> anyhow::Result<AccountStore> {
    let builder = if args.in_memory {
        AccountStore::builder(MemoryEngine::new())
    } else {
        AccountStore::builder(SledEngine::open(ctx.prepare_db_path()?)?)
    };
    let builder = builder.config(ctx.store_config()?);

    #[cfg(feature = "insecure-bench")]
    let builder = if args.insecure {
        builder.insecure_plaintext_passwords()
    } else {
        builder
    };

    Ok(builder.build()?)
}

async fn populate(store: &AccountStore, records: u64, quiet: bool) -> anyhow::Result<()> {
    let term = Terminal::detect(false);
    let mut progress = ProgressBar::new(&term, records, "records written", quiet);
    for index in 0..records {
        store
            .add_user(
                &bench_email(index),
                bench::PASSWORD,
                json!({ "some": "data", "field": index }),
            )
            .await?;
        progress.inc();
    }
    progress.finish(&format!("{} records written", records));
    info!(records, "Populated benchmark store");
    Ok(())
}

async fn run_op(store: &AccountStore, op: BenchOp, email: &str, seq: u64) -> Result<(), UserDbError> {
    match op {
        BenchOp::Read => store.find_user(email).await.map(|_| ()),
        BenchOp::Modify => {
            store
                .modify_user(email, json!({ "some": "data", "foobar": seq }))
                .await
        }
        BenchOp::ChangePassword => store.change_password(email, &format!("password{}", seq)).await,
        BenchOp::Insert => {
            store
                .add_user(email, &format!("password{}", seq), json!({ "data": seq }))
                .await
        }
    }
}

/// Drive the operation mix to completion and return the final counts.
async fn run_workload(
    store: Arc<AccountStore>,
    plan: &BenchPlan,
    quiet: bool,
) -> anyhow::Result<Snapshot> {
    let semaphore = Arc::new(Semaphore::new(plan.concurrency as usize));
    let counters = Arc::new(Counters::default());
    let mut next_insert = plan.records;
    let mut rng = StdRng::from_entropy();

    let sampler = tokio::spawn(report_rates(Arc::clone(&counters), plan.sample, quiet));

    for seq in 0..plan.ops {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| anyhow::anyhow!("Benchmark semaphore closed: {}", e))?;
        let op = BenchOp::pick(&mut rng);
        let email = match op {
            BenchOp::Insert => {
                next_insert += 1;
                bench_email(next_insert - 1)
            }
            _ => bench_email(rng.gen_range(0..plan.records.max(1))),
        };

        let store = Arc::clone(&store);
        let counters = Arc::clone(&counters);
        tokio::spawn(async move {
            let ok = run_op(&store, op, &email, seq).await.is_ok();
            counters.record(op, ok);
            drop(permit);
        });
    }

    // Every permit back means every operation has finished.
    let _all = semaphore
        .acquire_many(plan.concurrency)
        .await
        .map_err(|e| anyhow::anyhow!("Benchmark semaphore closed: {}", e))?;
    sampler.abort();

    Ok(counters.snapshot())
}

async fn report_rates(counters: Arc<Counters>, every: Duration, quiet: bool) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await;
    let mut last = counters.snapshot();
    loop {
        interval.tick().await;
        let now = counters.snapshot();
        let delta = now.since(&last);
        info!(ops = delta.ops, errs = delta.errs, "Benchmark sample");
        if !quiet {
            println!("{}", delta.rates_line(every.as_secs_f64()));
        }
        last = now;
    }
}

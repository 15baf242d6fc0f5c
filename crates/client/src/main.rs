use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tokio::io::AsyncBufReadExt;

use telexport_client::table::{PageMarker, Sort};
use telexport_client::{
    ClientSettings, HttpJobGateway, JobActions, JobGateway, JobSnapshot, PollWorker, Reconciler,
    RefreshMode, SortDirection, SortKey, SubmitForm, TableState,
};
use telexport_core::JobId;

#[derive(Parser, Debug)]
#[command(name = "telexport")]
#[command(version)]
#[command(about = "Submit and track telemetry export jobs")]
#[command(propagate_version = true)]
struct Args {
    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortColumn {
    JobId,
    Tenant,
    Created,
    Status,
    From,
    To,
}

impl From<SortColumn> for SortKey {
    fn from(value: SortColumn) -> Self {
        match value {
            SortColumn::JobId => SortKey::JobId,
            SortColumn::Tenant => SortKey::Tenant,
            SortColumn::Created => SortKey::CreatedAt,
            SortColumn::Status => SortKey::Status,
            SortColumn::From => SortKey::DateFrom,
            SortColumn::To => SortKey::DateTo,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List export jobs
    List {
        /// Column to sort by
        #[arg(long)]
        sort: Option<SortColumn>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Page to show (1-based)
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Keep the job table on screen, refreshing until interrupted
    Watch,
    /// Request a new export
    Submit {
        /// First day to export (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to export, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Restrict to one tenant (default: all tenants)
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Cancel a queued or running export
    Cancel { job_id: JobId },
    /// Delete an export
    Delete {
        job_id: JobId,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Download a completed export
    Download {
        job_id: JobId,

        /// Directory to write the file into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let settings = ClientSettings::load().context("failed to load client settings")?;
    telexport_observability::init_with(settings.log_format()?);

    let gateway: Arc<dyn JobGateway> = Arc::new(HttpJobGateway::from_settings(&settings)?);
    let reconciler = Arc::new(Reconciler::new(gateway.clone()));
    let actions = JobActions::attach(gateway, &reconciler);

    match args.command {
        Commands::List { sort, desc, page } => {
            reconciler.refresh(RefreshMode::Initial).await;
            let snapshot = reconciler.snapshot();
            fail_on_refresh_error(&snapshot)?;

            let mut table = TableState::new(settings.page_size);
            table.set_sort(sort.map(|column| Sort {
                key: column.into(),
                direction: if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            }));
            if !table.go_to(page, snapshot.jobs.len()) && page != 1 {
                anyhow::bail!("page {page} does not exist");
            }
            print_jobs(&args.output, &snapshot, &table)?;
        }
        Commands::Watch => {
            let mut updates = reconciler.subscribe();
            let handle = PollWorker::new(reconciler.clone(), settings.poll_interval()).start();
            let table = TableState::new(settings.page_size);

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        if snapshot.loading {
                            continue;
                        }
                        if let Some(error) = &snapshot.error {
                            eprintln!("Error: {error}");
                        }
                        print_jobs(&args.output, &snapshot, &table)?;
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            handle.shutdown().await;
        }
        Commands::Submit { from, to, tenant } => {
            let form = SubmitForm {
                date_from: from,
                date_to: to,
                tenant_id: tenant,
            };
            let job = actions.submit(&form).await?;
            match args.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&job)?),
                OutputFormat::Table => {
                    println!("Request submitted successfully!");
                    println!("Job ID: {}", job.job_id);
                }
            }
        }
        Commands::Cancel { job_id } => {
            load(&reconciler).await?;
            actions.cancel(&job_id).await?;
            println!("Cancellation requested for job {job_id}");
        }
        Commands::Delete { job_id, yes } => {
            load(&reconciler).await?;
            let prompt = actions.request_delete(&job_id)?;
            if !yes && !confirm(&prompt.message).await? {
                actions.dismiss_delete();
                println!("Aborted.");
                return Ok(());
            }
            actions.confirm_delete().await?;
            println!("Export job {job_id} deleted");
        }
        Commands::Download { job_id, out } => {
            load(&reconciler).await?;
            let file = actions.download(&job_id).await?;
            let path = file
                .save_into(&out)
                .await
                .with_context(|| format!("failed to write into {}", out.display()))?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

/// Load the job list that action guards check against.
async fn load(reconciler: &Reconciler) -> anyhow::Result<()> {
    reconciler.refresh(RefreshMode::Initial).await;
    fail_on_refresh_error(&reconciler.snapshot())
}

fn fail_on_refresh_error(snapshot: &JobSnapshot) -> anyhow::Result<()> {
    match &snapshot.error {
        Some(error) => anyhow::bail!("{error}"),
        None => Ok(()),
    }
}

async fn confirm(message: &str) -> anyhow::Result<bool> {
    print!("{message} [y/N] ");
    std::io::stdout().flush()?;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_jobs(
    output: &OutputFormat,
    snapshot: &JobSnapshot,
    table: &TableState,
) -> anyhow::Result<()> {
    let page = table.view(&snapshot.rows());

    if let OutputFormat::Json = output {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.total == 0 {
        println!("No export jobs yet.");
        return Ok(());
    }

    println!(
        "{:<38} {:<14} {:<24} {:<14} {:<14} STATUS",
        "JOB ID", "TENANT", "CREATED", "FROM", "TO"
    );
    println!("{}", "-".repeat(116));
    for row in &page.rows {
        let status = match (&row.progress, &row.error) {
            (_, Some(error)) => format!("{} ({error})", row.status_label),
            (Some(progress), None) if !row.status.is_terminal() && row.status.is_known() => {
                format!("{} {:.0}%", row.status_label, progress.percent)
            }
            _ => row.status_label.clone(),
        };
        println!(
            "{:<38} {:<14} {:<24} {:<14} {:<14} {}",
            row.job_id,
            row.tenant_display,
            row.created_at_display,
            row.date_from_display,
            row.date_to_display,
            status
        );
    }
    println!();
    println!("{}", page.summary());

    if page.total_pages > 1 {
        let pages: Vec<String> = page
            .markers
            .iter()
            .map(|marker| match marker {
                PageMarker::Page(n) if *n == page.page => format!("[{n}]"),
                PageMarker::Page(n) => n.to_string(),
                PageMarker::Ellipsis => "...".to_string(),
            })
            .collect();
        println!("Pages: {}", pages.join(" "));
    }
    Ok(())
}

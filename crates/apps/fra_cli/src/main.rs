use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use foundation::GeoBounds;
use portal_api::{ApiConfig, BatchProgress, PortalClient};
use portal_model::{
    BeneficiaryProfile, ClaimFacets, ClaimStats, ClaimsFilter, ClaimsQuery, Dashboard,
    DashboardSummary, format_compact, format_indian, select_state, top_districts,
};
use serde::Serialize;
use serde_json::{Value, json};
use spatial_sync::{
    FilterKey, LayerSet, Marker, RequestCoordinator, Selection, SpatialSync, SyncConfig,
    SyncSnapshot, render,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Command-line client for the FRA Atlas portal")]
struct Args {
    /// Base URL of the portal API (env: FRA_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Base URL of the document analysis service (env: FRA_DOCUMENT_URL)
    #[arg(long, global = true)]
    document_url: Option<String>,

    /// HTTP timeout in seconds (env: FRA_HTTP_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

/// Remote filters shared by `claims` and `spatial`. `all` means unset.
#[derive(ClapArgs, Debug, Default)]
struct RemoteFilters {
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    village: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List states known to the portal
    States,

    /// Fetch claims, optionally narrowed further on this side
    Claims {
        #[command(flatten)]
        filters: RemoteFilters,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        claim_type: Option<String>,

        #[arg(long)]
        tribal_group: Option<String>,

        /// Matches claimant name, claim id, village or district
        #[arg(long)]
        search: Option<String>,

        /// Include select options derived from the result
        #[arg(long)]
        facets: bool,
    },

    /// Run one map synchronization cycle and print the markers
    Spatial {
        /// Bounding box: west,south,east,north
        #[arg(long)]
        bbox: String,

        #[command(flatten)]
        filters: RemoteFilters,

        /// Comma-separated layers: claims, assets, land-use
        #[arg(long, default_value = "claims,assets")]
        layers: String,

        #[arg(long)]
        search: Option<String>,
    },

    /// Official statistics for a state, or the portal-wide summary
    Dashboard {
        /// Unknown names fall back to the first state the portal lists
        #[arg(long)]
        state: Option<String>,

        /// Districts to list, by descending claim count
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// OCR and entity extraction on FRA claim forms
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Land cover segmentation of imagery
    Segment {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Asset detection on imagery
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Scheme recommendations
    Recommend {
        #[command(subcommand)]
        command: RecommendCommand,
    },

    /// Village profile and development priorities
    Village {
        #[command(subcommand)]
        command: VillageCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RecommendCommand {
    /// For an existing claim or beneficiary id
    Claim {
        id: String,

        /// Use the rule-based engine instead of the model
        #[arg(long)]
        rules: bool,
    },

    /// From a free-text description
    Chat {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// For a hypothetical beneficiary
    Profile {
        #[arg(long)]
        age: u32,
        #[arg(long, default_value = "Male")]
        gender: String,
        #[arg(long, default_value = "Gond")]
        tribal_group: String,
        #[arg(long, default_value = "Devigarh")]
        village: String,
        #[arg(long, default_value_t = 0.0)]
        claim_area_ha: f64,
        #[arg(long, default_value_t = 0)]
        total_assets: u32,
        #[arg(long, default_value_t = 0)]
        family_members: u32,
    },
}

#[derive(Subcommand, Debug)]
enum VillageCommand {
    Profile { name: String },
    Priorities { name: String },
}

impl Args {
    fn config(&self) -> ApiConfig {
        let mut config = ApiConfig::from_env();
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.clone());
        }
        if let Some(url) = &self.document_url {
            config = config.with_document_url(url.clone());
        }
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();
    let client = PortalClient::new(&config).context("failed to build HTTP client")?;
    info!("Using API at {}", config.api_url);

    match args.command {
        Command::States => print_json(&client.states().await?),
        Command::Claims {
            filters,
            limit,
            claim_type,
            tribal_group,
            search,
            facets,
        } => {
            let query = ClaimsQuery {
                state: filters.state,
                district: filters.district.clone(),
                village: filters.village.clone(),
                status: filters.status.clone(),
                limit,
            };
            let claims = client.claims(&query).await?;
            let local = ClaimsFilter {
                status: filters.status.unwrap_or_default(),
                district: filters.district.unwrap_or_default(),
                village: filters.village.unwrap_or_default(),
                claim_type: claim_type.unwrap_or_default(),
                tribal_group: tribal_group.unwrap_or_default(),
                search_term: search.unwrap_or_default(),
            };
            let matched = local.apply(&claims);
            let mut out = json!({
                "stats": ClaimStats::from_claims(matched.iter().copied()),
                "claims": matched,
            });
            if facets {
                out["facets"] = serde_json::to_value(ClaimFacets::from_claims(&claims))?;
            }
            print_json(&out)
        }
        Command::Spatial {
            bbox,
            filters,
            layers,
            search,
        } => {
            let bounds = GeoBounds::parse_bbox(&bbox).context("invalid --bbox")?;
            let layers = LayerSet::parse_list(&layers)?;
            if layers.is_empty() {
                bail!("--layers selects nothing");
            }
            let out = spatial_cycle(client, bounds, &filters, layers, search.as_deref()).await?;
            print_json(&out)
        }
        Command::Dashboard { state, top } => match state {
            Some(wanted) => {
                let states = client.states().await?;
                let Some(state) = select_state(&states, &wanted) else {
                    bail!("the portal lists no states");
                };
                if state != wanted {
                    warn!("{wanted} is not offered, showing {state}");
                }
                let dashboard = client.dashboard(state).await?;
                print_json(&dashboard_report(&dashboard, top))
            }
            None => print_json(&summary_report(&client.dashboard_summary().await?)),
        },
        Command::Analyze { files } => {
            print_json(&client.analyze_documents(&files, log_progress).await)
        }
        Command::Segment { files } => {
            print_json(&client.segment_land_cover_batch(&files, log_progress).await)
        }
        Command::Detect { files } => {
            print_json(&client.detect_assets_batch(&files, log_progress).await)
        }
        Command::Recommend { command } => match command {
            RecommendCommand::Claim { id, rules: false } => {
                print_json(&client.ai_recommendations(&id).await?)
            }
            RecommendCommand::Claim { id, rules: true } => {
                print_json(&client.rule_recommendations(&id).await?)
            }
            RecommendCommand::Chat { query } => {
                print_json(&client.chat_recommendations(&query.join(" ")).await?)
            }
            RecommendCommand::Profile {
                age,
                gender,
                tribal_group,
                village,
                claim_area_ha,
                total_assets,
                family_members,
            } => {
                let profile = BeneficiaryProfile {
                    age,
                    gender,
                    tribal_group,
                    village,
                    claim_area_ha,
                    total_assets,
                    family_members,
                };
                print_json(&client.recommend_for_profile(&profile).await?)
            }
        },
        Command::Village { command } => match command {
            VillageCommand::Profile { name } => print_json(&client.village_profile(&name).await?),
            VillageCommand::Priorities { name } => {
                print_json(&client.intervention_priorities(&name).await?)
            }
        },
    }
}

async fn spatial_cycle(
    client: PortalClient,
    bounds: GeoBounds,
    filters: &RemoteFilters,
    layers: LayerSet,
    search: Option<&str>,
) -> Result<Value> {
    let config = SyncConfig {
        debounce: Duration::ZERO,
        ..SyncConfig::default()
    };
    let sync = SpatialSync::spawn_with(Arc::new(client), config, RequestCoordinator::new(layers));

    let remote = [
        (FilterKey::State, &filters.state),
        (FilterKey::District, &filters.district),
        (FilterKey::Village, &filters.village),
        (FilterKey::Status, &filters.status),
    ];
    for (key, value) in remote {
        if let Some(value) = value {
            sync.set_filter(key, value.as_str()).await?;
        }
    }
    sync.viewport_settled(bounds).await?;
    let snapshot = sync.wait_idle().await?;
    sync.shutdown().await;

    Ok(spatial_report(&snapshot, search.unwrap_or("")))
}

fn spatial_report(snapshot: &SyncSnapshot, search: &str) -> Value {
    let markers = render(&snapshot.store, snapshot.layers, &Selection::default(), search);
    let counts: serde_json::Map<String, Value> = snapshot
        .layers
        .iter()
        .map(|layer| {
            let slot = snapshot.store.slot(layer);
            (
                layer.to_string(),
                json!({ "records": slot.records().len(), "dropped": slot.dropped() }),
            )
        })
        .collect();

    json!({
        "query": snapshot.descriptor.as_ref().map(|d| d.query_string()),
        "layers": counts,
        "markers": markers.iter().map(marker_json).collect::<Vec<_>>(),
        "notices": snapshot
            .notices
            .iter()
            .map(|n| json!({ "source": n.source, "message": n.message }))
            .collect::<Vec<_>>(),
    })
}

fn marker_json(marker: &Marker) -> Value {
    json!({
        "layer": marker.layer.as_str(),
        "id": marker.id.as_str(),
        "lat": marker.position.lat,
        "lon": marker.position.lon,
        "label": marker.label,
        "color": marker.style.color,
    })
}

fn dashboard_report(dashboard: &Dashboard, top: usize) -> Value {
    let stats = &dashboard.official_stats;
    json!({
        "state": dashboard.state,
        "claims": format_indian(stats.total_claims),
        "titles": format_indian(stats.total_titles),
        "rejected": format_indian(stats.claims_rejected),
        "pending": format_indian(stats.pending_claims()),
        "forest_land": format_indian(stats.total_forest_land),
        "percent_disposed": stats.percent_claims_disposed,
        "top_districts": top_districts(&dashboard.district_drilldown_stats, top)
            .iter()
            .map(|d| json!({ "district": d.district, "claims": format_compact(d.total_claims) }))
            .collect::<Vec<_>>(),
    })
}

fn summary_report(summary: &DashboardSummary) -> Value {
    json!({
        "claims": format_indian(summary.total_claims),
        "approval_rate": summary.approval_rate,
        "pending": format_indian(summary.pending_claims),
        "rejected": format_indian(summary.rejected_claims),
        "districts": format_indian(summary.district_count),
        "villages": format_indian(summary.village_count),
    })
}

fn log_progress(p: BatchProgress) {
    if p.finished {
        info!("[{:>3.0}%] {} done", p.fraction * 100.0, p.filename);
    } else {
        info!("[{:>3.0}%] uploading {}", p.fraction * 100.0, p.filename);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

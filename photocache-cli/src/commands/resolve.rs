//! Resolve command - replay requests through the decision engine.
//!
//! A JSON fixture stands in for the upstream provider. Each pass resolves the
//! same bounding box, so the first pass typically goes live and later passes
//! show how the recorded coverage is used.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use photocache::config::ConfigFile;
use photocache::coverage::CoverageRecord;
use photocache::engine::{CacheDecisionEngine, Resolution};
use photocache::geo::BoundingBox;
use photocache::photo::CachedPhoto;
use photocache::provider::PoolFetcher;
use photocache::store::{CoverageStore, MemoryCoverageStore, MemoryPhotoStore};

use super::common::load_photos;
use crate::error::CliError;

/// Coverage verdict to pre-record for the query region.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum SeedCoverage {
    /// Last fetch returned fewer than requested
    Complete,
    /// Last fetch was filled to the limit
    Incomplete,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Query box as min_lon,min_lat,max_lon,max_lat
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    /// Maximum photos per request
    #[arg(long)]
    pub max: usize,

    /// JSON photo file served as the live provider
    #[arg(long)]
    pub upstream: PathBuf,

    /// JSON photo file preloaded into the cache
    #[arg(long)]
    pub cached: Option<PathBuf>,

    /// Coverage verdict to record for the region before the first pass
    #[arg(long, value_enum)]
    pub coverage: Option<SeedCoverage>,

    /// Number of passes
    #[arg(long, default_value_t = 2)]
    pub repeat: u32,

    /// Fixed sampler seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Bypass the cache regardless of config
    #[arg(long)]
    pub no_cache: bool,
}

/// Run the resolve command.
pub fn run(args: ResolveArgs, config: &ConfigFile) -> Result<(), CliError> {
    let upstream = load_photos(&args.upstream)?;
    let cached = match &args.cached {
        Some(path) => load_photos(path)?,
        None => Vec::new(),
    };

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(async {
        let session = Session::new(&args, config, upstream, cached)?;
        if let Some(seed) = args.coverage {
            session.seed_coverage(&args.bbox, seed).await?;
        }

        for pass in 1..=args.repeat {
            let res = session.engine.resolve(args.bbox, args.max).await?;
            print_pass(pass, &res);
        }

        let stats = session.engine.cache_stats().await?;
        println!();
        println!("Upstream calls: {}", session.upstream.calls());
        println!("Metrics:        {}", session.engine.metrics());
        println!("Cache:          {}", stats);
        Ok::<(), CliError>(())
    })
}

fn print_pass(pass: u32, res: &Resolution) {
    println!(
        "pass {:>3}: source={:<13} photos={:<6} score={:.4}",
        pass,
        res.source.as_str(),
        res.photos.len(),
        res.distribution_score
    );
}

/// Engine plus the in-memory collaborators it runs against.
struct Session {
    engine: CacheDecisionEngine,
    coverage: Arc<MemoryCoverageStore>,
    upstream: Arc<PoolFetcher>,
    cached_count: usize,
}

impl Session {
    fn new(
        args: &ResolveArgs,
        config: &ConfigFile,
        upstream: Vec<CachedPhoto>,
        cached: Vec<CachedPhoto>,
    ) -> Result<Self, CliError> {
        let mut engine_config = config.engine_config();
        if args.no_cache {
            engine_config = engine_config.with_cache_enabled(false);
        }
        if let Some(seed) = args.seed {
            engine_config = engine_config.with_sampler_seed(seed);
        }

        let cached_count = cached.len();
        let photos = Arc::new(MemoryPhotoStore::with_photos(cached));
        let coverage = Arc::new(MemoryCoverageStore::new(
            config.cache.max_regions,
            config.cache.region_ttl,
        ));
        let upstream = Arc::new(PoolFetcher::new(upstream));
        let engine =
            CacheDecisionEngine::new(engine_config, photos, coverage.clone(), upstream.clone())?;

        Ok(Self {
            engine,
            coverage,
            upstream,
            cached_count,
        })
    }

    async fn seed_coverage(&self, bbox: &BoundingBox, seed: SeedCoverage) -> Result<(), CliError> {
        let returned = self.cached_count;
        let requested = match seed {
            SeedCoverage::Complete => returned + 1,
            SeedCoverage::Incomplete => returned,
        };
        let record = CoverageRecord::from_fetch(self.engine.region_key(bbox), requested, returned);
        self.coverage
            .put(record)
            .await
            .map_err(|e| CliError::Resolve(e.into()))
    }
}

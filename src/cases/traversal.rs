//! Query latency over a prepopulated graph.
//!
//! The graph is a chain of entities where every `shortcut_every`-th entity also
//! gets a link from the entity that many positions back. Each entity carries an
//! indexed `name` property. Every query is repeated and reported as the average
//! time per repetition, where smaller is better.

use std::{path::PathBuf, sync::Arc, time::Instant};

use serde_json::json;
use tracing::{debug, info};

use crate::{
    bfs::{bfs_neighbors, shortest_path},
    config::TraversalConfig,
    domain::{
        CaseResult, Comparer, Metric,
        metric::AVERAGE_FOR_PREFIX,
        units::MILLISECOND,
    },
    errors::GraphBenchError,
    store::{EntityHandle, SqliteStore, SqliteUnitOfWork, Store, UnitOfWork},
};

use super::{BenchmarkCase, StoreFixture, mixedload::workers::LINK_TYPE};

pub const CASE_NAME: &str = "TraversalQueriesCase";
pub const NAME_INDEX: &str = "names";
pub const NAME_KEY: &str = "name";

pub const START_POINT_LOOKUP: &str = "Indexed start point lookup";
pub const NEIGHBOURHOOD_EXPANSION: &str = "Breadth-first expansion from start points";
pub const SHORTEST_PATH: &str = "Shortest path between neighbouring start points";

const POPULATE_BATCH: usize = 1_000;

pub fn entity_name(position: usize) -> String {
    format!("entity-{position}")
}

/// Creates the chain-plus-shortcut graph and returns the handles in chain order.
pub fn populate<S: Store>(
    store: &S,
    config: &TraversalConfig,
) -> Result<Vec<EntityHandle>, GraphBenchError> {
    let mut handles: Vec<EntityHandle> = Vec::with_capacity(config.entities);
    while handles.len() < config.entities {
        let uow = store.begin_unit_of_work()?;
        let end = (handles.len() + POPULATE_BATCH).min(config.entities);
        for position in handles.len()..end {
            let created = uow.create_entity()?;
            let name = json!(entity_name(position));
            uow.set_property(created, NAME_KEY, name.clone())?;
            uow.index_add(NAME_INDEX, created, NAME_KEY, &name)?;
            if let Some(&previous) = handles.last() {
                uow.create_relationship(previous, created, LINK_TYPE)?;
            }
            let every = config.shortcut_every;
            if every > 1 && position >= every && position % every == 0 {
                uow.create_relationship(handles[position - every], created, LINK_TYPE)?;
            }
            handles.push(created);
        }
        uow.commit()?;
    }
    Ok(handles)
}

/// Positions of `count` start points spread evenly along the chain.
pub fn start_positions(entities: usize, count: usize) -> Vec<usize> {
    if entities == 0 || count == 0 {
        return Vec::new();
    }
    let count = count.min(entities);
    let stride = entities / count;
    (0..count).map(|i| i * stride).collect()
}

pub struct TraversalQueriesCase {
    config: TraversalConfig,
    store_dir: Option<PathBuf>,
    in_memory: bool,
    fixture: Option<StoreFixture>,
    start_names: Vec<String>,
}

impl TraversalQueriesCase {
    pub fn new(config: TraversalConfig, store_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            store_dir,
            in_memory: false,
            fixture: None,
            start_names: Vec::new(),
        }
    }

    pub fn in_memory(config: TraversalConfig) -> Self {
        Self {
            in_memory: true,
            ..Self::new(config, None)
        }
    }

    fn store(&self) -> Result<Arc<SqliteStore>, GraphBenchError> {
        self.fixture
            .as_ref()
            .map(StoreFixture::store)
            .ok_or_else(|| GraphBenchError::invalid_input("traversal case was not set up"))
    }

    fn look_up_starts<U: UnitOfWork>(&self, uow: &U) -> Result<Vec<EntityHandle>, GraphBenchError> {
        let mut starts = Vec::with_capacity(self.start_names.len());
        for name in &self.start_names {
            let found = uow.index_lookup(NAME_INDEX, NAME_KEY, &json!(name))?;
            let handle = found
                .first()
                .copied()
                .ok_or_else(|| GraphBenchError::not_found(format!("start point {name}")))?;
            starts.push(handle);
        }
        Ok(starts)
    }

    /// Average milliseconds per repetition of `query`, each in a read-only unit of work.
    fn time_query<F>(
        &self,
        store: &SqliteStore,
        name: &str,
        mut query: F,
    ) -> Result<Metric, GraphBenchError>
    where
        F: FnMut(&SqliteUnitOfWork<'_>, usize) -> Result<usize, GraphBenchError>,
    {
        let repetitions = self.config.repetitions.max(1);
        let mut touched = 0usize;
        let begin = Instant::now();
        for repetition in 0..repetitions {
            let uow = store.begin_unit_of_work()?;
            touched += query(&uow, repetition)?;
            uow.rollback()?;
        }
        let average = begin.elapsed().as_secs_f64() * 1000.0 / repetitions as f64;
        debug!(query = name, average_ms = average, touched, "query timed");
        Ok(Metric::tracked(
            format!("{AVERAGE_FOR_PREFIX}{name}"),
            average,
            MILLISECOND,
            Comparer::SmallerIsBetter,
        ))
    }
}

impl BenchmarkCase for TraversalQueriesCase {
    fn name(&self) -> &str {
        CASE_NAME
    }

    fn set_up(&mut self) -> Result<(), GraphBenchError> {
        if self.config.start_points == 0 || self.config.entities < self.config.start_points {
            return Err(GraphBenchError::invalid_input(
                "traversal needs at least one start point and no more start points than entities",
            ));
        }
        let fixture = if self.in_memory {
            StoreFixture::in_memory()?
        } else {
            StoreFixture::on_disk(self.store_dir.as_deref(), CASE_NAME, 1)?
        };
        let began = Instant::now();
        populate(&*fixture.store(), &self.config)?;
        info!(
            entities = self.config.entities,
            elapsed_ms = began.elapsed().as_millis() as u64,
            "traversal graph populated"
        );
        self.start_names = start_positions(self.config.entities, self.config.start_points)
            .into_iter()
            .map(entity_name)
            .collect();
        self.fixture = Some(fixture);
        Ok(())
    }

    fn run(&mut self) -> Result<CaseResult, GraphBenchError> {
        let store = self.store()?;
        let depth = self.config.depth;

        let lookup = self.time_query(&*store, START_POINT_LOOKUP, |uow, _| {
            Ok(self.look_up_starts(uow)?.len())
        })?;
        let expansion = self.time_query(&*store, NEIGHBOURHOOD_EXPANSION, |uow, _| {
            let mut reached = 0;
            for start in self.look_up_starts(uow)? {
                reached += bfs_neighbors(uow, start, depth)?.len();
            }
            Ok(reached)
        })?;
        let path = self.time_query(&*store, SHORTEST_PATH, |uow, repetition| {
            let starts = self.look_up_starts(uow)?;
            if starts.len() < 2 {
                return Ok(0);
            }
            let from = repetition % (starts.len() - 1);
            let found = shortest_path(uow, starts[from], starts[from + 1])?;
            Ok(found.map_or(0, |p| p.len()))
        })?;

        CaseResult::new(CASE_NAME, vec![lookup, expansion, path])
    }

    fn tear_down(&mut self) -> Result<(), GraphBenchError> {
        self.fixture = None;
        self.start_names.clear();
        Ok(())
    }
}

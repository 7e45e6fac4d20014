use std::{fmt, ops::RangeInclusive, time::Duration};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::{debug, error, info, warn};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{sleep_until, Instant},
};

use crate::{
    builder::FeatureBuilder,
    config::DashboardConfig,
    feature::{FeatureId, Metric, PopularityFeature},
    filter::{FilterRange, MetricBounds},
    histogram::{HistogramError, HistogramRenderer},
    legend::Legend,
    map::{MapRenderer, Tooltip},
    outline::ReferenceOutline,
    source::{fetch_outline, HttpPopularitySource, PopularitySource, SourceError},
    station::StationRecord,
    style::OpacityScale,
    time_window::TimeWindow,
};

#[derive(Clone, Debug, PartialEq)]
pub enum DashboardError {
    Source(SourceError),
    Histogram(HistogramError),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Source(e) => write!(f, "{e}"),
            DashboardError::Histogram(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DashboardError {}

impl From<SourceError> for DashboardError {
    fn from(e: SourceError) -> Self {
        DashboardError::Source(e)
    }
}

impl From<HistogramError> for DashboardError {
    fn from(e: HistogramError) -> Self {
        DashboardError::Histogram(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Updating,
    QueuedUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    InitialLoad,
    TimeWindowChanged,
    AggregateToggled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// Fetch and redraw now
    StartCycle,
    /// A cycle is running; run once more after it and the rerun delay
    ScheduleRerun,
    /// A rerun is already pending and will pick up the latest parameters
    Coalesce,
}

impl UpdateState {
    pub fn on_trigger(self) -> (UpdateState, UpdateAction) {
        match self {
            UpdateState::Idle => (UpdateState::Updating, UpdateAction::StartCycle),
            UpdateState::Updating => (UpdateState::QueuedUpdate, UpdateAction::ScheduleRerun),
            UpdateState::QueuedUpdate => (UpdateState::QueuedUpdate, UpdateAction::Coalesce),
        }
    }

    /// A queued request stays queued until its rerun comes due
    pub fn on_cycle_complete(self) -> UpdateState {
        match self {
            UpdateState::QueuedUpdate => UpdateState::QueuedUpdate,
            UpdateState::Idle | UpdateState::Updating => UpdateState::Idle,
        }
    }

    /// Returns the next state and whether a cycle should start
    pub fn on_rerun_due(self) -> (UpdateState, bool) {
        match self {
            UpdateState::QueuedUpdate => (UpdateState::Updating, true),
            other => (other, false),
        }
    }
}

/// Collapses a burst of pokes into a single firing once the input has been quiet for `delay`
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            deadline: None,
        }
    }

    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Clears the pending deadline, returning whether it had come due
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SetStartHour(u8),
    SetEndHour(u8),
    SetAggregate(bool),
    SelectBuckets {
        metric: Metric,
        buckets: RangeInclusive<usize>,
    },
    ClearSelection(Metric),
    Hover(Option<FeatureId>),
}

type CycleResult = Result<(Vec<StationRecord>, bool), SourceError>;
type CycleFetch = BoxFuture<'static, CycleResult>;

/// Application state of the dashboard. Every mutation goes through the event loop in
/// [`Dashboard::run`], one event or fetch completion at a time.
pub struct Dashboard<S> {
    source: S,
    builder: FeatureBuilder,
    state: UpdateState,
    window: TimeWindow,
    aggregate: bool,
    filter: FilterRange,
    features: Vec<PopularityFeature>,
    map: MapRenderer,
    legend: Option<Legend>,
    origin_histogram: HistogramRenderer,
    destination_histogram: HistogramRenderer,
    hovered: Option<FeatureId>,
    tooltip: Option<Tooltip>,
    slider: Debouncer,
    rerun_delay: Duration,
    rerun_at: Option<Instant>,
    completed_cycles: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl Dashboard<HttpPopularitySource> {
    /// Loads the reference outline once and wires up the HTTP popularity source
    pub async fn connect(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let client = reqwest::Client::new();
        let outline = fetch_outline(&client, &config.outline_url).await?;
        let source = HttpPopularitySource::with_client(client, &config.endpoint);
        Ok(Dashboard::new(source, &outline, config))
    }
}

impl<S: PopularitySource> Dashboard<S> {
    pub fn new(source: S, outline: &ReferenceOutline, config: &DashboardConfig) -> Self {
        Dashboard {
            source,
            builder: FeatureBuilder::new(outline, config.hex_cell_side_km),
            state: UpdateState::Idle,
            window: config.initial_window,
            aggregate: config.aggregate,
            filter: FilterRange::new(),
            features: vec![],
            map: MapRenderer::new(Some(outline.overlay().clone())),
            legend: None,
            origin_histogram: HistogramRenderer::new(Metric::OriginPopularity, config.bucket_count),
            destination_histogram: HistogramRenderer::new(
                Metric::DestinationPopularity,
                config.bucket_count,
            ),
            hovered: None,
            tooltip: None,
            slider: Debouncer::new(config.slider_debounce()),
            rerun_delay: config.rerun_delay(),
            rerun_at: None,
            completed_cycles: 0,
            last_updated: None,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn aggregate(&self) -> bool {
        self.aggregate
    }

    pub fn filter(&self) -> &FilterRange {
        &self.filter
    }

    pub fn features(&self) -> &[PopularityFeature] {
        &self.features
    }

    pub fn map(&self) -> &MapRenderer {
        &self.map
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn histogram(&self, metric: Metric) -> &HistogramRenderer {
        match metric {
            Metric::OriginPopularity => &self.origin_histogram,
            Metric::DestinationPopularity => &self.destination_histogram,
        }
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Drives the dashboard until the event channel closes and all pending work has drained.
    /// A failed fetch ends the loop with the error.
    pub async fn run(
        &mut self,
        mut events: UnboundedReceiver<UiEvent>,
    ) -> Result<(), DashboardError> {
        let mut in_flight = self.trigger(Trigger::InitialLoad, Instant::now());
        let mut events_open = true;

        loop {
            if !events_open
                && in_flight.is_none()
                && self.slider.deadline().is_none()
                && self.rerun_at.is_none()
            {
                break;
            }

            tokio::select! {
                result = next_completion(&mut in_flight) => {
                    in_flight = None;
                    let (records, aggregate) = result.map_err(|e| {
                        error!("popularity fetch for {} failed: {e}", self.window);
                        e
                    })?;
                    self.complete_cycle(records, aggregate);
                }
                _ = sleep_until_deadline(self.slider.deadline()) => {
                    let now = Instant::now();
                    if self.slider.fire(now) {
                        if let Some(fetch) = self.trigger(Trigger::TimeWindowChanged, now) {
                            in_flight = Some(fetch);
                        }
                    }
                }
                _ = sleep_until_deadline(self.rerun_at), if in_flight.is_none() => {
                    self.rerun_at = None;
                    in_flight = self.rerun();
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Some(trigger) = self.handle_event(event, Instant::now()) {
                            if let Some(fetch) = self.trigger(trigger, Instant::now()) {
                                in_flight = Some(fetch);
                            }
                        }
                    }
                    None => events_open = false,
                },
            }
        }

        Ok(())
    }

    /// Applies a UI event, returning the trigger it produces if it needs fresh data
    pub fn handle_event(&mut self, event: UiEvent, now: Instant) -> Option<Trigger> {
        match event {
            UiEvent::SetStartHour(hour) => {
                self.window.set_start_hour(hour);
                self.slider.poke(now);
                None
            }
            UiEvent::SetEndHour(hour) => {
                self.window.set_end_hour(hour);
                self.slider.poke(now);
                None
            }
            UiEvent::SetAggregate(aggregate) => {
                if aggregate == self.aggregate {
                    return None;
                }
                self.aggregate = aggregate;
                Some(Trigger::AggregateToggled)
            }
            UiEvent::SelectBuckets { metric, buckets } => {
                if let Err(e) = self.select_buckets(metric, buckets) {
                    warn!("ignoring histogram selection: {e}");
                }
                None
            }
            UiEvent::ClearSelection(metric) => {
                self.clear_selection(metric);
                None
            }
            UiEvent::Hover(id) => {
                self.hovered = id;
                self.refresh_tooltip();
                None
            }
        }
    }

    /// Narrows the map to the selected histogram buckets without refetching
    pub fn select_buckets(
        &mut self,
        metric: Metric,
        buckets: RangeInclusive<usize>,
    ) -> Result<MetricBounds, DashboardError> {
        let histogram = match metric {
            Metric::OriginPopularity => &mut self.origin_histogram,
            Metric::DestinationPopularity => &mut self.destination_histogram,
        };
        let bounds = histogram.select_range(buckets, &mut self.filter)?;
        self.redraw();
        Ok(bounds)
    }

    pub fn clear_selection(&mut self, metric: Metric) {
        let histogram = match metric {
            Metric::OriginPopularity => &mut self.origin_histogram,
            Metric::DestinationPopularity => &mut self.destination_histogram,
        };
        histogram.deselect(&mut self.filter);
        self.redraw();
    }

    /// Replaces the map layer. The tooltip survives only if its feature is still drawn.
    fn redraw(&mut self) {
        self.map.render(&self.features, &self.filter);
        self.refresh_tooltip();
    }

    fn refresh_tooltip(&mut self) {
        self.tooltip = self.hovered.as_ref().and_then(|id| self.map.hover(id));
        if self.tooltip.is_none() {
            self.hovered = None;
        }
    }

    fn trigger(&mut self, trigger: Trigger, now: Instant) -> Option<CycleFetch> {
        let (next, action) = self.state.on_trigger();
        debug!("{trigger:?}: {:?} -> {next:?} ({action:?})", self.state);
        self.state = next;

        match action {
            UpdateAction::StartCycle => Some(self.begin_cycle()),
            UpdateAction::ScheduleRerun => {
                self.rerun_at = Some(now + self.rerun_delay);
                None
            }
            UpdateAction::Coalesce => None,
        }
    }

    fn rerun(&mut self) -> Option<CycleFetch> {
        let (next, start) = self.state.on_rerun_due();
        debug!("rerun due: {:?} -> {next:?}", self.state);
        self.state = next;
        start.then(|| self.begin_cycle())
    }

    fn begin_cycle(&mut self) -> CycleFetch {
        self.filter.clear_all();

        let aggregate = self.aggregate;
        info!(
            "fetching popularity for {} ({})",
            self.window,
            if aggregate { "aggregated" } else { "stations" }
        );

        let fetch = self.source.fetch(self.window);
        Box::pin(async move { fetch.await.map(|records| (records, aggregate)) })
    }

    fn complete_cycle(&mut self, records: Vec<StationRecord>, aggregate: bool) {
        self.features = self.builder.build(records, aggregate).collect();
        self.filter.clear_all();
        self.hovered = None;
        self.tooltip = None;

        self.map.render(&self.features, &self.filter);
        self.legend = Some(Legend::new(&OpacityScale::for_features(&self.features)));
        self.origin_histogram.update(&self.features);
        self.destination_histogram.update(&self.features);

        self.completed_cycles += 1;
        self.last_updated = Some(Utc::now());
        self.state = self.state.on_cycle_complete();
        info!(
            "cycle {} drew {} features, now {:?}",
            self.completed_cycles,
            self.features.len(),
            self.state
        );
    }
}

async fn next_completion(in_flight: &mut Option<CycleFetch>) -> CycleResult {
    match in_flight {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

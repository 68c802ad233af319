use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::egui::{self, Align, Context, Layout, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use token_cloud::cloud::{ChargeMode, CollisionMode};
use token_cloud::{Document, LayoutConfig, NodeKey, TickReport, WordCloud};

mod canvas;
mod controls;
mod render_utils;

pub(crate) const CONTROLS_WIDTH: f32 = 300.0;

pub struct TokenCloudApp {
    input: Option<PathBuf>,
    config: LayoutConfig,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Vec<Document>, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    documents: Vec<Document>,
    source: String,
    config: LayoutConfig,
    cloud: WordCloud,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    layout_revision: u64,
    layout_dirty: bool,
    live_physics: bool,
    show_edges: bool,
    show_bounding_boxes: bool,
    collision_enabled: bool,
    collision_strength: f32,
    constant_charge: f32,
    last_report: TickReport,
    error: Option<String>,
}

struct SearchMatchCache {
    query: String,
    layout_revision: u64,
    matches: Arc<HashSet<NodeKey>>,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl TokenCloudApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, input: Option<PathBuf>, config: LayoutConfig) -> Self {
        let state = Self::start_load(input.clone());
        Self {
            input,
            config,
            state,
        }
    }

    fn start_load(input: Option<PathBuf>) -> AppState {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result =
                crate::load_documents(input.as_deref()).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }
}

fn source_label(input: Option<&Path>) -> String {
    input.map_or_else(|| "bundled sample".to_owned(), |path| path.display().to_string())
}

impl eframe::App for TokenCloudApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(documents) => {
                            tracing::info!(documents = documents.len(), "loaded documents");
                            AppState::Ready(Box::new(ViewModel::new(
                                documents,
                                source_label(self.input.as_deref()),
                                self.config.clone(),
                            )))
                        }
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading documents...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load documents");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.input.clone()));
                    }
                });
            }
            AppState::Ready(model) => model.show(ctx),
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(documents: Vec<Document>, source: String, config: LayoutConfig) -> Self {
        let (collision_enabled, collision_strength) = match config.collision {
            CollisionMode::Disabled => (false, 0.5),
            CollisionMode::BoundingBox { strength } => (true, strength),
        };
        let constant_charge = match config.charge_mode {
            ChargeMode::Frequency => ChargeMode::DEFAULT_CONSTANT,
            ChargeMode::Constant { charge } => charge,
        };

        Self {
            documents,
            source,
            config,
            cloud: WordCloud::new(),
            search: String::new(),
            search_match_cache: None,
            layout_revision: 0,
            layout_dirty: true,
            live_physics: true,
            show_edges: false,
            show_bounding_boxes: false,
            collision_enabled,
            collision_strength,
            constant_charge,
            last_report: TickReport::idle(),
            error: None,
        }
    }

    fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("token-cloud");
                    ui.separator();
                    ui.label(format!("source: {}", self.source));
                    ui.label(format!("documents: {}", self.documents.len()));
                    if let Some(graph) = self.cloud.state().map(|state| state.graph()) {
                        ui.label(format!("tokens: {}", graph.token_count()));
                        ui.label(format!("edges: {}", graph.edges.len()));
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("step {}", self.last_report.step));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(CONTROLS_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui));
    }

    /// Keeps the layout surface matched to the canvas and restarts the
    /// layout when settings changed.
    fn ensure_layout(&mut self, canvas: Vec2) {
        let resized = self.cloud.surface().is_none_or(|surface| {
            (surface.width - canvas.x).abs() > 1.0 || (surface.height - canvas.y).abs() > 1.0
        });
        if resized && let Err(error) = self.cloud.initial_render(canvas.x, canvas.y) {
            self.error = Some(error.to_string());
            return;
        }

        if self.layout_dirty {
            self.restart_layout();
        }
    }

    fn restart_layout(&mut self) {
        self.layout_dirty = false;
        self.last_report = TickReport::idle();
        self.layout_revision += 1;
        self.search_match_cache = None;

        self.error = self
            .cloud
            .update(&self.documents, &self.config)
            .err()
            .map(|error| error.to_string());
    }

    fn cached_matches(&mut self) -> Option<Arc<HashSet<NodeKey>>> {
        let query = self.search.trim().to_owned();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.layout_revision == self.layout_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let graph = self.cloud.state()?.graph();
        let matcher = SkimMatcherV2::default();
        let matches = graph
            .keys()
            .zip(&graph.nodes)
            .filter(|(_, node)| {
                !node.is_fixed() && fuzzy_match_score(&matcher, node.label(), &query).is_some()
            })
            .map(|(key, _)| key)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query,
            layout_revision: self.layout_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }
}

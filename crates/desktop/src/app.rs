//! Omni Chat Desktop — egui app state and UI.

use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};
use omnichat::auth::{CredentialCheck, SessionGate};
use omnichat::config::Config;
use omnichat::conversation::{Conversation, Message};
use omnichat::dispatch;
use omnichat::storage::{FileStore, KeyValueStore, MemoryStore};
use omnichat::webhook::{Webhook, WebhookClient, WebhookError, WebhookReply};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};

const LOG_BUFFER_MAX_LINES: usize = 2000;
const CONTENT_MAX_WIDTH: f32 = 720.0;

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    /// Debug for our own crates, info and up for dependencies (hyper and reqwest are chatty).
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info || metadata.target().starts_with("omnichat")
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        push_log_line(format!(
            "{} [{}] {}: {}",
            clock_time(),
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

pub fn install_logger() {
    let _ = log_buffer();
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Debug);
}

/// UTC wall-clock time of day, HH:MM:SS.mmm.
fn clock_time() -> String {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = t.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        t.subsec_millis()
    )
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Logs,
}

type Store = Box<dyn KeyValueStore>;

/// Open the persisted store, falling back to memory so the app still starts.
fn open_store(config: &Config, config_path: &std::path::Path) -> Store {
    let path = omnichat::config::resolve_store_path(config, config_path);
    match FileStore::open(&path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::error!("{}; login will not be remembered", e);
            Box::new(MemoryStore::new())
        }
    }
}

pub struct OmniChatApp {
    gate: SessionGate<Store>,
    /// Contents of the password field on the login screen.
    password_input: String,
    conversation: Conversation,
    /// Layout cache for bot replies rendered as markdown.
    markdown_cache: CommonMarkCache,
    /// None when the webhook could not be configured; sends then fail like any other request.
    webhook: Option<WebhookClient>,
    /// Why `webhook` is None, shown above the thread.
    webhook_error: Option<String>,
    /// When Some, a request is in flight; its result arrives here.
    reply_receiver: Option<mpsc::Receiver<Result<WebhookReply, WebhookError>>>,
    runtime: tokio::runtime::Runtime,
    current_screen: Screen,
}

impl OmniChatApp {
    /// Space between a screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 24.0;

    pub fn new(config: Config, config_path: PathBuf, runtime: tokio::runtime::Runtime) -> Self {
        let mut gate = SessionGate::new(open_store(&config, &config_path));
        gate.restore_session();

        let (webhook, webhook_error) = match WebhookClient::from_config(&config) {
            Ok(client) => (Some(client), None),
            Err(e) => {
                log::error!("{}", e);
                (None, Some(e.to_string()))
            }
        };

        log::info!("desktop started (config {})", config_path.display());
        Self {
            gate,
            password_input: String::new(),
            conversation: Conversation::with_spaces(&config.spaces),
            markdown_cache: CommonMarkCache::default(),
            webhook,
            webhook_error,
            reply_receiver: None,
            runtime,
            current_screen: Screen::default(),
        }
    }

    fn submit_login(&mut self) {
        if submit_password(&mut self.gate, &mut self.password_input) {
            self.current_screen = Screen::Chat;
        }
    }

    /// Start a request on the runtime if the input is sendable and nothing is in flight.
    fn start_request(&mut self, ctx: &egui::Context) {
        if self.reply_receiver.is_some() {
            return;
        }
        let Some(request) = dispatch::begin(&mut self.conversation) else {
            return;
        };
        let Some(client) = self.webhook.clone() else {
            dispatch::settle(&mut self.conversation, Err(WebhookError::MissingUrl));
            return;
        };
        let (tx, rx) = mpsc::channel();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = client.post(&request).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });
        self.reply_receiver = Some(rx);
    }

    /// Poll for the in-flight reply and settle the conversation. Call each frame.
    fn poll_reply(&mut self) {
        let result = match &self.reply_receiver {
            Some(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(mpsc::TryRecvError::Empty) => return,
                Err(mpsc::TryRecvError::Disconnected) => Err(WebhookError::Interrupted),
            },
            None => return,
        };
        self.reply_receiver = None;
        dispatch::settle(&mut self.conversation, result);
    }

    fn ui_login(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.25);
            ui.heading("Admin Login");
            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

            let response = ui.add(
                egui::TextEdit::singleline(&mut self.password_input)
                    .password(true)
                    .hint_text("Enter password")
                    .desired_width(280.0),
            );
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let error = self.gate.login_error();
            if !error.is_empty() {
                ui.add_space(8.0);
                ui.colored_label(egui::Color32::RED, error);
            }
            ui.add_space(12.0);
            if ui.button("Login").clicked() || enter {
                self.submit_login();
            }
            response.request_focus();
        });
    }

    /// Renders a single chat message: user messages as strong plain text on the extreme
    /// background, bot messages as markdown on the panel fill.
    fn render_chat_message(
        ui: &mut egui::Ui,
        cache: &mut CommonMarkCache,
        index: usize,
        m: &Message,
    ) {
        let is_user = m.is_user();
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(12.0))
            .inner_margin(egui::Margin::symmetric(14.0, 8.0));

        let layout = if is_user {
            egui::Layout::right_to_left(egui::Align::Min)
        } else {
            egui::Layout::left_to_right(egui::Align::Min)
        };
        ui.with_layout(layout, |ui| {
            ui.set_max_width(ui.available_width() * 0.85);
            frame.show(ui, |ui| {
                if is_user {
                    ui.label(egui::RichText::new(&m.text).strong());
                } else {
                    CommonMarkViewer::new(("bot_message", index)).show(ui, cache, &m.text);
                }
            });
        });
    }

    /// Messages fill the panel with stick-to-bottom; the input row lives in a bottom panel.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        if let Some(ref err) = self.webhook_error {
            ui.colored_label(egui::Color32::RED, format!("Webhook unavailable: {}", err));
            ui.add_space(8.0);
        }
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.set_max_width(CONTENT_MAX_WIDTH);
                if self.conversation.messages().is_empty() {
                    ui.add_space(24.0);
                    ui.label(
                        egui::RichText::new("Hello! How can I assist you today?")
                            .heading()
                            .weak(),
                    );
                }
                for (i, m) in self.conversation.messages().iter().enumerate() {
                    Self::render_chat_message(ui, &mut self.markdown_cache, i, m);
                    ui.add_space(10.0);
                }
                if let Some(status) = self.conversation.status_line() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(egui::RichText::new(status).italics().weak());
                    });
                }
                ui.add_space(Self::SCREEN_FOOTER_SPACING);
            });
    }

    fn ui_input_bar(&mut self, ui: &mut egui::Ui) {
        let busy = self.conversation.is_loading();
        let mut send_now = false;
        ui.add_space(10.0);
        ui.horizontal(|ui| {
            let spaces = self.conversation.spaces().to_vec();
            if !spaces.is_empty() {
                let selected = self.conversation.space().unwrap_or("—").to_string();
                ui.add_enabled_ui(!busy, |ui| {
                    egui::ComboBox::from_id_source("space_select")
                        .selected_text(selected.as_str())
                        .show_ui(ui, |ui| {
                            for s in &spaces {
                                if ui.selectable_label(selected == *s, s).clicked() {
                                    if let Err(e) = self.conversation.set_space(s) {
                                        log::warn!("{}", e);
                                    }
                                }
                            }
                        });
                });
            }

            let can_submit = self.conversation.can_submit();
            let hint = self.conversation.input_hint();
            let send_width = 64.0;
            let response = ui.add_enabled(
                !busy,
                egui::TextEdit::singleline(self.conversation.input_mut())
                    .hint_text(hint)
                    .desired_width((ui.available_width() - send_width).max(120.0)),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send_now = true;
                response.request_focus();
            }
            if ui
                .add_enabled(can_submit, egui::Button::new("Send"))
                .clicked()
            {
                send_now = true;
            }
        });
        ui.add_space(10.0);
        if send_now {
            let ctx = ui.ctx().clone();
            self.start_request(&ctx);
        }
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
    }
}

/// Try the typed password. The field is cleared only when the login succeeds so a typo can
/// be corrected next to the error.
fn submit_password<S: KeyValueStore, C: CredentialCheck>(
    gate: &mut SessionGate<S, C>,
    password: &mut String,
) -> bool {
    if gate.login(password.as_str()).is_err() {
        return false;
    }
    password.clear();
    true
}

impl eframe::App for OmniChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_reply();

        if !self.gate.is_logged_in() {
            egui::CentralPanel::default().show(ctx, |ui| self.ui_login(ui));
            return;
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 12.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.heading("Omni Chat");
                        ui.add_space(24.0);
                        ui.selectable_value(&mut self.current_screen, Screen::Chat, "Chat");
                        ui.selectable_value(&mut self.current_screen, Screen::Logs, "Logs");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Logout").clicked() {
                                self.gate.logout();
                            }
                        });
                    });
                });
        });

        match self.current_screen {
            Screen::Chat => {
                egui::TopBottomPanel::bottom("input_bar").show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                        .show(ui, |ui| self.ui_input_bar(ui));
                });
                egui::CentralPanel::default().show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                        .show(ui, |ui| {
                            ui.add_space(16.0);
                            self.ui_chat(ui);
                        });
                });
            }
            Screen::Logs => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                        .show(ui, |ui| self.ui_logs_screen(ui));
                });
            }
        }
    }
}

//! Preview window.
//!
//! The egui update callback is the driving loop: each update runs one
//! session tick, uploads the frame to a texture, and draws the controls.
//! Nothing here blocks; a failed read schedules a delayed repaint instead
//! of sleeping.

use std::time::Instant;

use crate::decode::DecodedSymbol;
use crate::session::{ScanSession, TickOutcome, READ_RETRY_DELAY};

pub const WINDOW_TITLE: &str = "scanrelay - press Q to quit";

pub struct ScanApp {
    session: ScanSession,
    texture: Option<egui::TextureHandle>,
    last_dims: Option<(u32, u32)>,
    last_symbols: Vec<DecodedSymbol>,
    selected: u32,
    retry_at: Option<Instant>,
    closing: bool,
}

impl ScanApp {
    pub fn new(session: ScanSession) -> Self {
        let selected = session.active_index().unwrap_or(0);
        Self {
            session,
            texture: None,
            last_dims: None,
            last_symbols: Vec::new(),
            selected,
            retry_at: None,
            closing: false,
        }
    }

    fn pump_session(&mut self, ctx: &egui::Context, now: Instant) {
        if let Some(at) = self.retry_at {
            if now < at {
                return;
            }
            self.retry_at = None;
        }

        match self.session.tick(now) {
            TickOutcome::Frame(report) => {
                self.last_dims = Some((report.frame.width(), report.frame.height()));
                self.last_symbols = report.symbols;
                let size = [report.frame.width() as usize, report.frame.height() as usize];
                let image = egui::ColorImage::from_rgb(size, report.frame.as_rgb());
                match &mut self.texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.texture =
                            Some(ctx.load_texture("preview", image, egui::TextureOptions::LINEAR))
                    }
                }
            }
            TickOutcome::ReadFailed => {
                self.retry_at = Some(now + READ_RETRY_DELAY);
            }
        }
    }
}

impl eframe::App for ScanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            self.closing = true;
            self.session.shutdown();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            self.closing = true;
            self.session.shutdown();
        }
        if self.closing {
            return;
        }

        self.pump_session(ctx, now);

        // The selector follows the actually-open device, so an open-failure
        // fallback shows up here without extra plumbing.
        if let Some(active) = self.session.active_index() {
            self.selected = active;
        }
        let cameras: Vec<u32> = self.session.cameras().to_vec();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mut selected = self.selected;
                egui::ComboBox::from_label("camera")
                    .selected_text(format!("Camera {}", selected))
                    .show_ui(ui, |ui| {
                        for index in cameras {
                            ui.selectable_value(&mut selected, index, format!("Camera {}", index));
                        }
                    });
                if selected != self.selected {
                    self.selected = selected;
                    self.session.request_switch(selected);
                }

                if self.retry_at.is_some() {
                    ui.colored_label(egui::Color32::LIGHT_RED, "no signal, retrying");
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let dims = self
                .last_dims
                .map(|(w, h)| format!("{}x{}", w, h))
                .unwrap_or_else(|| "-".to_string());
            let payload = self
                .session
                .last_payload()
                .map(truncate_payload)
                .unwrap_or_else(|| "-".to_string());
            let device = self
                .session
                .capture_stats()
                .map(|stats| stats.device)
                .unwrap_or_else(|| "no device".to_string());
            ui.label(format!(
                "{} | {} | frames {} | emitted {} | last: {}",
                device,
                dims,
                self.session.frames_processed(),
                self.session.payloads_emitted(),
                payload
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(texture) = &self.texture {
                let response =
                    ui.add(egui::Image::from_texture(texture).max_size(ui.available_size()));
                if let Some((frame_w, frame_h)) = self.last_dims {
                    paint_symbol_outlines(
                        ui.painter(),
                        response.rect,
                        (frame_w, frame_h),
                        &self.last_symbols,
                    );
                }
                if self.session.is_cooling(now) {
                    let remaining = self.session.cooldown_remaining(now);
                    ui.painter().text(
                        response.rect.left_top() + egui::vec2(8.0, 8.0),
                        egui::Align2::LEFT_TOP,
                        format!("repeat suppressed: {}s", remaining.as_secs_f32().ceil()),
                        egui::FontId::proportional(16.0),
                        egui::Color32::YELLOW,
                    );
                }
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("waiting for first frame");
                });
            }
        });

        match self.retry_at {
            Some(at) => ctx.request_repaint_after(at.saturating_duration_since(now)),
            None => ctx.request_repaint(),
        }
    }
}

/// Outline detected symbols over the preview, mapping frame pixel
/// coordinates into the drawn image rect.
fn paint_symbol_outlines(
    painter: &egui::Painter,
    rect: egui::Rect,
    frame_dims: (u32, u32),
    symbols: &[DecodedSymbol],
) {
    let (frame_w, frame_h) = frame_dims;
    if frame_w == 0 || frame_h == 0 {
        return;
    }
    let scale_x = rect.width() / frame_w as f32;
    let scale_y = rect.height() / frame_h as f32;

    for symbol in symbols {
        let Some(corners) = symbol.corners else {
            continue;
        };
        let points: Vec<egui::Pos2> = corners
            .iter()
            .map(|corner| {
                egui::pos2(
                    rect.left() + corner.x as f32 * scale_x,
                    rect.top() + corner.y as f32 * scale_y,
                )
            })
            .collect();
        painter.add(egui::Shape::closed_line(
            points,
            egui::Stroke::new(2.0, egui::Color32::GREEN),
        ));
    }
}

fn truncate_payload(payload: &str) -> String {
    const MAX: usize = 48;
    if payload.chars().count() <= MAX {
        payload.to_string()
    } else {
        let head: String = payload.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

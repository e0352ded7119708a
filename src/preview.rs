//! Preview window showing the camera feed with the tracked hand.

use std::sync::Arc;

use eframe::egui;

use crate::gesture::ScrollDirection;
use crate::hand_tracker::landmarks;
use crate::pipeline::{CaptureStatus, SharedState};

const LANDMARK_RADIUS: f32 = 4.0;

pub struct PreviewApp {
    state: Arc<SharedState>,
    texture: Option<egui::TextureHandle>,
}

impl PreviewApp {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self {
            state,
            texture: None,
        }
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        if ctx.input(|i| i.key_pressed(egui::Key::Q) || i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        match self.state.status() {
            CaptureStatus::Running => {}
            CaptureStatus::Stopped => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
            CaptureStatus::Failed(reason) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.colored_label(
                            egui::Color32::RED,
                            format!("Capture stopped: {}\n\nPress Q to quit", reason),
                        );
                    });
                });
                return;
            }
        }

        let (frame_data, width, height, points, gestures, scroll, pointer) = {
            let snap = self.state.snapshot();
            (
                snap.frame.clone(),
                snap.frame_width as usize,
                snap.frame_height as usize,
                snap.landmarks.clone(),
                snap.gestures,
                snap.scroll,
                snap.pointer,
            )
        };

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let on = |active: bool| {
                    if active {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::GRAY
                    }
                };
                ui.colored_label(on(gestures.click), "click");
                ui.colored_label(on(gestures.right_click), "right click");
                let scroll_text = match scroll {
                    Some(ScrollDirection::Up) => "scroll up",
                    Some(ScrollDirection::Down) => "scroll down",
                    None => "no scroll",
                };
                ui.colored_label(on(scroll.is_some()), scroll_text);
                ui.separator();
                match pointer {
                    Some((x, y)) => ui.label(format!("pointer ({}, {})", x, y)),
                    None => ui.label("no hand"),
                };
                ui.separator();
                ui.label("Q to quit");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let expected_size = width * height * 3;
            let Some(data) = frame_data.filter(|d| expected_size > 0 && d.len() >= expected_size) else {
                ui.centered_and_justified(|ui| {
                    ui.label("Waiting for camera feed...");
                });
                return;
            };

            let image = egui::ColorImage::from_rgb([width, height], &data[..expected_size]);
            let texture = self.texture.get_or_insert_with(|| {
                ctx.load_texture("camera_frame", image.clone(), egui::TextureOptions::LINEAR)
            });
            texture.set(image, egui::TextureOptions::LINEAR);

            // Fit the frame into the panel, keeping its aspect ratio
            let available_size = ui.available_size();
            let aspect = width as f32 / height as f32;
            let display_size = if available_size.x / available_size.y > aspect {
                egui::vec2(available_size.y * aspect, available_size.y)
            } else {
                egui::vec2(available_size.x, available_size.x / aspect)
            };
            let (rect, _response) = ui.allocate_exact_size(available_size, egui::Sense::hover());
            let image_rect = egui::Rect::from_center_size(rect.center(), display_size);

            ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            let Some(points) = points else {
                return;
            };
            let scale_x = display_size.x / width as f32;
            let scale_y = display_size.y / height as f32;
            let to_screen = |(x, y): (f32, f32)| {
                egui::pos2(image_rect.min.x + x * scale_x, image_rect.min.y + y * scale_y)
            };

            let bone = egui::Stroke::new(2.0, egui::Color32::WHITE);
            for (a, b) in landmarks::CONNECTIONS {
                if let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) {
                    ui.painter().line_segment([to_screen(pa), to_screen(pb)], bone);
                }
            }
            for (i, &p) in points.iter().enumerate() {
                let color = match i {
                    landmarks::INDEX_FINGER_TIP => egui::Color32::from_rgb(255, 100, 100),
                    landmarks::THUMB_TIP | landmarks::MIDDLE_FINGER_TIP => egui::Color32::YELLOW,
                    _ => egui::Color32::from_rgb(100, 180, 255),
                };
                ui.painter().circle_filled(to_screen(p), LANDMARK_RADIUS, color);
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.stop();
    }
}

use std::collections::HashMap;

use client_core::data_url;
use crossbeam_channel::Receiver;
use eframe::egui;
use egui::{load::SizedTexture, TextureHandle};
use shared::domain::{ImageSlot, ACCEPTED_IMAGE_EXTENSIONS};

use crate::controller::{
    events::{UiAction, UiEvent},
    form::FormController,
    orchestration::ChannelCommandSink,
};
use crate::ui::view_model::{ElementId, FormView, ViewModel};

const PREVIEW_MAX_WIDTH: f32 = 320.0;
const RESULT_MAX_WIDTH: f32 = 420.0;
const DECODE_MAX_EDGE: u32 = 1024;

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub server_url: String,
    pub extra_fields: Vec<(String, String)>,
}

struct CachedTexture {
    source: String,
    texture: Option<TextureHandle>,
}

/// Textures decoded from the data URLs held in the view model, keyed by the
/// element showing them. Re-decoded only when an element's source changes.
#[derive(Default)]
struct TextureCache {
    entries: HashMap<ElementId, CachedTexture>,
}

impl TextureCache {
    fn texture(
        &mut self,
        ctx: &egui::Context,
        view: &ViewModel,
        id: ElementId,
    ) -> Option<TextureHandle> {
        let source = view.image_source(id).filter(|source| !source.is_empty())?;
        if let Some(cached) = self.entries.get(&id) {
            if cached.source == source {
                return cached.texture.clone();
            }
        }

        let texture = match decode_image_source(&source) {
            Ok(color_image) => Some(ctx.load_texture(
                format!("blend-studio:{}", id.dom_id()),
                color_image,
                egui::TextureOptions::LINEAR,
            )),
            Err(err) => {
                tracing::warn!(element = id.dom_id(), "failed to decode image source: {err}");
                None
            }
        };
        self.entries.insert(
            id,
            CachedTexture {
                source,
                texture: texture.clone(),
            },
        );
        texture
    }
}

fn decode_image_source(source: &str) -> Result<egui::ColorImage, String> {
    let (_, bytes) =
        data_url::decode(source).ok_or_else(|| "not a base64 data url".to_string())?;
    let dynamic = image::load_from_memory(&bytes).map_err(|err| err.to_string())?;
    let rgba = dynamic.thumbnail(DECODE_MAX_EDGE, DECODE_MAX_EDGE).to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

pub struct BlendStudioApp {
    controller: FormController<ViewModel, ChannelCommandSink>,
    ui_rx: Receiver<UiEvent>,
    textures: TextureCache,
    server_url: String,
}

impl BlendStudioApp {
    pub fn new(
        commands: ChannelCommandSink,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
    ) -> Self {
        let mut controller = FormController::new(ViewModel::blend_form(), commands)
            .with_extra_fields(startup.extra_fields);
        controller.handle_action(UiAction::RefreshCaptchaClicked);
        Self {
            controller,
            ui_rx,
            textures: TextureCache::default(),
            server_url: startup.server_url,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.controller.handle_event(event);
        }
    }
}

fn show_image(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    view: &ViewModel,
    id: ElementId,
    max_width: f32,
) {
    match textures.texture(ui.ctx(), view, id) {
        Some(texture) => {
            ui.add(
                egui::Image::new(SizedTexture::from_handle(&texture))
                    .max_width(max_width)
                    .maintain_aspect_ratio(true),
            );
        }
        None => {
            ui.weak("(no image)");
        }
    }
}

fn show_image_inputs(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    view: &ViewModel,
    actions: &mut Vec<UiAction>,
) {
    ui.columns(2, |columns| {
        for (column, slot) in columns.iter_mut().zip(ImageSlot::ALL) {
            let input = ElementId::file_input(slot);
            column.push_id(input.dom_id(), |ui| {
                ui.strong(format!("Image {}", slot.index() + 1));
                ui.horizontal(|ui| {
                    if ui.button("Choose file…").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", ACCEPTED_IMAGE_EXTENSIONS)
                            .pick_file()
                        {
                            actions.push(UiAction::FileSelected {
                                slot,
                                path: Some(path),
                            });
                        }
                    }
                    let chosen = view.value(input);
                    if chosen.is_empty() {
                        ui.weak("No file chosen");
                    } else {
                        ui.label(chosen);
                        if ui.small_button("✕").on_hover_text("Clear").clicked() {
                            actions.push(UiAction::FileSelected { slot, path: None });
                        }
                    }
                });
                let preview = ElementId::preview(slot);
                if !view.is_hidden(preview) {
                    show_image(ui, textures, view, preview, PREVIEW_MAX_WIDTH);
                }
            });
        }
    });
}

fn show_captcha(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    view: &ViewModel,
    actions: &mut Vec<UiAction>,
) {
    ui.strong("Verification");
    ui.horizontal(|ui| {
        show_image(ui, textures, view, ElementId::CaptchaImage, 200.0);
        let refresh = ui.push_id(ElementId::RefreshCaptcha.dom_id(), |ui| {
            ui.button("⟳ New CAPTCHA")
        });
        if refresh.inner.clicked() {
            actions.push(UiAction::RefreshCaptchaClicked);
        }
    });
    let mut answer = view.value(ElementId::CaptchaInput);
    let response = ui.add(
        egui::TextEdit::singleline(&mut answer)
            .hint_text("Enter the characters shown above")
            .id_salt(ElementId::CaptchaInput.dom_id()),
    );
    if response.changed() {
        actions.push(UiAction::CaptchaAnswerEdited(answer));
    }
    if !view.is_hidden(ElementId::CaptchaStatus) {
        ui.colored_label(
            ui.visuals().warn_fg_color,
            view.text(ElementId::CaptchaStatus),
        );
    }
}

fn show_results(ui: &mut egui::Ui, textures: &mut TextureCache, view: &ViewModel) {
    ui.heading("Result");
    show_image(ui, textures, view, ElementId::BlendedResult, RESULT_MAX_WIDTH);
    ui.add_space(8.0);
    egui::Grid::new(ElementId::Results.dom_id())
        .num_columns(3)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            ui.strong("Image 1");
            ui.strong("Image 2");
            ui.strong("Blended");
            ui.end_row();
            show_image(ui, textures, view, ElementId::Result1, PREVIEW_MAX_WIDTH);
            show_image(ui, textures, view, ElementId::Result2, PREVIEW_MAX_WIDTH);
            ui.label("");
            ui.end_row();
            show_image(ui, textures, view, ElementId::Histogram1, PREVIEW_MAX_WIDTH);
            show_image(ui, textures, view, ElementId::Histogram2, PREVIEW_MAX_WIDTH);
            show_image(
                ui,
                textures,
                view,
                ElementId::HistogramBlended,
                PREVIEW_MAX_WIDTH,
            );
            ui.end_row();
        });
}

/// Formats a slider position the way a range input reports it: "0", "0.5", "1".
fn range_value_text(level: f64) -> String {
    let text = format!("{level:.1}");
    match text.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}

fn show_form(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    view: &ViewModel,
    actions: &mut Vec<UiAction>,
) {
    ui.heading("Image Blending Studio");
    ui.separator();

    show_image_inputs(ui, textures, view, actions);
    ui.separator();

    ui.horizontal(|ui| {
        let mut level = view
            .value(ElementId::BlendLevel)
            .parse::<f64>()
            .unwrap_or(0.5);
        let response = ui.add(
            egui::Slider::new(&mut level, 0.0..=1.0)
                .step_by(0.1)
                .show_value(false)
                .text("Blend level"),
        );
        if response.changed() {
            actions.push(UiAction::BlendLevelInput(range_value_text(level)));
        }
        ui.monospace(view.text(ElementId::BlendValue));
    });
    ui.separator();

    show_captcha(ui, textures, view, actions);
    ui.add_space(8.0);

    if ui
        .add_enabled(
            view.is_enabled(ElementId::BlendForm),
            egui::Button::new("Blend images"),
        )
        .clicked()
    {
        actions.push(UiAction::Submit);
    }

    if !view.is_hidden(ElementId::Loading) {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Blending images…");
        });
    }
    if !view.is_hidden(ElementId::Error) {
        ui.colored_label(ui.visuals().error_fg_color, view.text(ElementId::Error));
    }
    if !view.is_hidden(ElementId::Results) {
        ui.separator();
        show_results(ui, textures, view);
    }
}

impl eframe::App for BlendStudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        let mut actions = Vec::new();
        egui::TopBottomPanel::bottom("server_status").show(ctx, |ui| {
            ui.weak(format!("Server: {}", self.server_url));
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                show_form(ui, &mut self.textures, self.controller.view(), &mut actions);
            });
        });
        for action in actions {
            self.controller.handle_action(action);
        }

        if self.controller.submission().is_loading() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

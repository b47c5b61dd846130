//! In-memory element surface for the blend form.
//!
//! The controller only talks to `FormView`; the egui shell renders whatever
//! state the `ViewModel` holds.

use std::collections::HashMap;

use shared::domain::ImageSlot;

pub const DEFAULT_BLEND_LEVEL: &str = "0.5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    BlendLevel,
    BlendValue,
    RefreshCaptcha,
    CaptchaImage,
    CaptchaInput,
    CaptchaStatus,
    Image1,
    Image2,
    Preview1,
    Preview2,
    BlendForm,
    Loading,
    Results,
    Error,
    BlendedResult,
    Result1,
    Result2,
    Histogram1,
    Histogram2,
    HistogramBlended,
}

impl ElementId {
    pub fn dom_id(self) -> &'static str {
        match self {
            ElementId::BlendLevel => "blendLevel",
            ElementId::BlendValue => "blendValue",
            ElementId::RefreshCaptcha => "refreshCaptcha",
            ElementId::CaptchaImage => "captchaImage",
            ElementId::CaptchaInput => "captchaInput",
            ElementId::CaptchaStatus => "captchaStatus",
            ElementId::Image1 => "image1",
            ElementId::Image2 => "image2",
            ElementId::Preview1 => "preview1",
            ElementId::Preview2 => "preview2",
            ElementId::BlendForm => "blendForm",
            ElementId::Loading => "loading",
            ElementId::Results => "results",
            ElementId::Error => "error",
            ElementId::BlendedResult => "blendedResult",
            ElementId::Result1 => "result1",
            ElementId::Result2 => "result2",
            ElementId::Histogram1 => "histogram1",
            ElementId::Histogram2 => "histogram2",
            ElementId::HistogramBlended => "histogramBlended",
        }
    }

    pub fn file_input(slot: ImageSlot) -> Self {
        match slot {
            ImageSlot::First => ElementId::Image1,
            ImageSlot::Second => ElementId::Image2,
        }
    }

    pub fn preview(slot: ImageSlot) -> Self {
        match slot {
            ImageSlot::First => ElementId::Preview1,
            ImageSlot::Second => ElementId::Preview2,
        }
    }

    pub fn result(slot: ImageSlot) -> Self {
        match slot {
            ImageSlot::First => ElementId::Result1,
            ImageSlot::Second => ElementId::Result2,
        }
    }
}

pub trait FormView {
    fn text(&self, id: ElementId) -> String;
    fn set_text(&mut self, id: ElementId, text: &str);
    fn value(&self, id: ElementId) -> String;
    fn set_value(&mut self, id: ElementId, value: &str);
    fn image_source(&self, id: ElementId) -> Option<String>;
    fn set_image_source(&mut self, id: ElementId, source: &str);
    fn is_hidden(&self, id: ElementId) -> bool;
    fn set_hidden(&mut self, id: ElementId, hidden: bool);
    fn is_enabled(&self, id: ElementId) -> bool;
    fn set_enabled(&mut self, id: ElementId, enabled: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ElementState {
    text: String,
    value: String,
    image_source: Option<String>,
    hidden: bool,
    enabled: bool,
}

impl Default for ElementState {
    fn default() -> Self {
        Self {
            text: String::new(),
            value: String::new(),
            image_source: None,
            hidden: false,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    elements: HashMap<ElementId, ElementState>,
}

impl ViewModel {
    /// Initial state of the blend form as first rendered.
    pub fn blend_form() -> Self {
        let mut view = Self::default();
        view.set_value(ElementId::BlendLevel, DEFAULT_BLEND_LEVEL);
        view.set_text(ElementId::BlendValue, DEFAULT_BLEND_LEVEL);
        for id in [
            ElementId::Preview1,
            ElementId::Preview2,
            ElementId::Loading,
            ElementId::Results,
            ElementId::Error,
            ElementId::CaptchaStatus,
        ] {
            view.set_hidden(id, true);
        }
        view
    }

    fn element(&self, id: ElementId) -> Option<&ElementState> {
        self.elements.get(&id)
    }

    fn element_mut(&mut self, id: ElementId) -> &mut ElementState {
        self.elements.entry(id).or_default()
    }
}

impl FormView for ViewModel {
    fn text(&self, id: ElementId) -> String {
        self.element(id)
            .map(|element| element.text.clone())
            .unwrap_or_default()
    }

    fn set_text(&mut self, id: ElementId, text: &str) {
        self.element_mut(id).text = text.to_string();
    }

    fn value(&self, id: ElementId) -> String {
        self.element(id)
            .map(|element| element.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&mut self, id: ElementId, value: &str) {
        self.element_mut(id).value = value.to_string();
    }

    fn image_source(&self, id: ElementId) -> Option<String> {
        self.element(id).and_then(|element| element.image_source.clone())
    }

    fn set_image_source(&mut self, id: ElementId, source: &str) {
        self.element_mut(id).image_source = Some(source.to_string());
    }

    fn is_hidden(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(|element| element.hidden)
    }

    fn set_hidden(&mut self, id: ElementId, hidden: bool) {
        self.element_mut(id).hidden = hidden;
    }

    fn is_enabled(&self, id: ElementId) -> bool {
        self.element(id).map_or(true, |element| element.enabled)
    }

    fn set_enabled(&mut self, id: ElementId, enabled: bool) {
        self.element_mut(id).enabled = enabled;
    }
}

// src/formatting.rs

use crate::config::OutputFormat;
use crate::core::FieldState;
use crate::reconciler::ViewModel;
use std::fmt::Display;

const ABSENT: &str = "-";

/// A trait for rendering the view-model into a single string.
pub trait ViewFormatter: Send + Sync {
    fn format(&self, view: &ViewModel) -> String;
}

/// Returns the formatter for the configured output format.
pub fn formatter_for(format: OutputFormat) -> Box<dyn ViewFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::PlainText => Box::new(PlainTextFormatter),
    }
}

/// Two panels, device properties and weather, as aligned `Property: value` rows.
pub struct PlainTextFormatter;

impl PlainTextFormatter {
    fn row(out: &mut String, property: &str, value: impl Display) {
        out.push_str(&format!("  {:<20}{}\n", format!("{}:", property), value));
    }

    fn optional<T: Display>(value: Option<T>) -> String {
        value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
    }

    fn field<T>(state: &FieldState<T>, render: impl Fn(&T) -> String) -> String {
        match state {
            FieldState::Pending => ABSENT.to_string(),
            FieldState::Unsupported => "not supported".to_string(),
            FieldState::Unavailable => "unavailable".to_string(),
            FieldState::Present(value) => render(value),
        }
    }
}

impl ViewFormatter for PlainTextFormatter {
    fn format(&self, view: &ViewModel) -> String {
        let device = &view.device;
        let mut out = String::from("Device\n");
        Self::row(&mut out, "Ip", Self::optional(device.public_ip));
        Self::row(&mut out, "Browser", Self::optional(device.user_agent.as_deref()));
        Self::row(&mut out, "Version", Self::optional(device.app_version.as_deref()));
        Self::row(&mut out, "Platform", Self::optional(device.platform.as_deref()));
        Self::row(
            &mut out,
            "Screen",
            Self::optional(device.screen.map(|s| format!("{} x {}", s.width, s.height))),
        );
        Self::row(&mut out, "Language", Self::optional(device.language.as_deref()));
        Self::row(&mut out, "Location", Self::optional(device.page_url.as_deref()));
        Self::row(
            &mut out,
            "Battery",
            Self::field(&view.battery, |b| {
                format!("{}% Charging: {}", b.level_percent, b.charging)
            }),
        );
        Self::row(
            &mut out,
            "Plugins",
            Self::field(&view.plugins, |names| {
                if names.is_empty() {
                    "none".to_string()
                } else {
                    names.join(", ")
                }
            }),
        );
        Self::row(
            &mut out,
            "Mouse Coordinates",
            Self::field(&view.pointer, |p| format!("{}, {}", p.x, p.y)),
        );

        out.push_str("\nWeather\n");
        let weather = view.weather.as_ref();
        Self::row(&mut out, "Location", Self::optional(view.address.as_deref()));
        Self::row(&mut out, "Coordinates", Self::optional(view.location));
        Self::row(&mut out, "Timezone", Self::optional(weather.map(|w| &w.timezone_name)));
        Self::row(
            &mut out,
            "Temperature",
            Self::optional(weather.map(|w| format!("{} °F", w.temperature_f))),
        );
        Self::row(
            &mut out,
            "Feels Like",
            Self::optional(weather.map(|w| format!("{} °F", w.feels_like_f))),
        );
        Self::row(&mut out, "Weather", Self::optional(weather.map(|w| &w.description)));
        Self::row(&mut out, "Icon", Self::optional(weather.map(|w| &w.icon_url)));
        out
    }
}

/// The whole view-model as pretty-printed JSON.
pub struct JsonFormatter;

impl ViewFormatter for JsonFormatter {
    fn format(&self, view: &ViewModel) -> String {
        serde_json::to_string_pretty(view)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize view: {}\"}}", e))
    }
}

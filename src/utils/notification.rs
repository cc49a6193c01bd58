//! User-facing notifications: compile results, image loads, clipboard.
//!
//! Shader syntax errors do not go through here; they open the error window.

use eframe::egui::{self, Color32};
use std::time::{Duration, Instant};

/// Older notifications are dropped past this count.
const MAX_VISIBLE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    /// Sticky until dismissed.
    Error,
}

impl NotificationKind {
    fn duration(self) -> Duration {
        match self {
            NotificationKind::Error => Duration::from_secs(10),
            NotificationKind::Warning => Duration::from_secs(6),
            _ => Duration::from_secs(4),
        }
    }

    fn icon_and_color(self) -> (&'static str, Color32) {
        match self {
            NotificationKind::Success => ("✓", Color32::from_rgb(150, 255, 150)),
            NotificationKind::Info => ("ℹ", Color32::from_rgb(150, 200, 255)),
            NotificationKind::Warning => ("⚠", Color32::from_rgb(255, 220, 100)),
            NotificationKind::Error => ("⚠", Color32::from_rgb(255, 150, 150)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    created_at: Instant,
    dismissed: bool,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at: Instant::now(),
            dismissed: false,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        if self.dismissed {
            return false;
        }
        self.kind == NotificationKind::Error
            || now.duration_since(self.created_at) <= self.kind.duration()
    }

    /// Fade in over 0.15s, out over the last 0.4s.
    fn opacity(&self, now: Instant) -> f32 {
        if self.kind == NotificationKind::Error {
            return 1.0;
        }
        let elapsed = now.duration_since(self.created_at).as_secs_f32();
        let total = self.kind.duration().as_secs_f32();
        if elapsed < 0.15 {
            elapsed / 0.15
        } else if elapsed > total - 0.4 {
            ((total - elapsed) / 0.4).max(0.0)
        } else {
            1.0
        }
    }
}

#[derive(Default)]
pub struct NotificationManager {
    notifications: Vec<Notification>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, notification: Notification) {
        log::debug!("Notification ({:?}): {}", notification.kind, notification.message);
        self.notifications.push(notification);
        if self.notifications.len() > MAX_VISIBLE {
            let excess = self.notifications.len() - MAX_VISIBLE;
            self.notifications.drain(..excess);
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationKind::Success));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationKind::Info));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationKind::Warning));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationKind::Error));
    }

    pub fn has_notifications(&self) -> bool {
        let now = Instant::now();
        self.notifications.iter().any(|n| n.is_live(now))
    }

    pub fn dismiss_all(&mut self) {
        for n in &mut self.notifications {
            n.dismissed = true;
        }
    }

    fn prune(&mut self, now: Instant) {
        self.notifications.retain(|n| n.is_live(now));
    }

    /// Stack live notifications in the bottom-right corner.
    pub fn render(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        self.prune(now);
        if self.notifications.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notifications"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-20.0, -20.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.spacing_mut().item_spacing = egui::vec2(0.0, 8.0);
                for notification in self.notifications.iter_mut().rev() {
                    let (icon, color) = notification.kind.icon_and_color();
                    let alpha = (notification.opacity(now) * 255.0) as u8;
                    let fill = ui.visuals().panel_fill;

                    egui::Frame::new()
                        .fill(Color32::from_rgba_unmultiplied(fill.r(), fill.g(), fill.b(), alpha))
                        .stroke(ui.visuals().window_stroke())
                        .corner_radius(8.0)
                        .inner_margin(egui::Margin::symmetric(12, 8))
                        .show(ui, |ui| {
                            ui.set_max_width(360.0);
                            ui.horizontal(|ui| {
                                ui.label(
                                    egui::RichText::new(format!("{} {}", icon, notification.message))
                                        .size(14.0)
                                        .color(color.gamma_multiply(alpha as f32 / 255.0)),
                                );
                                if notification.kind == NotificationKind::Error
                                    && ui.small_button("✕").clicked()
                                {
                                    notification.dismissed = true;
                                }
                            });
                        });
                }
            });

        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_expires() {
        let n = Notification::new("ok", NotificationKind::Success);
        let later = n.created_at + Duration::from_secs(5);
        assert!(n.is_live(n.created_at));
        assert!(!n.is_live(later));
    }

    #[test]
    fn test_error_is_sticky_until_dismissed() {
        let mut mgr = NotificationManager::new();
        mgr.error("image failed");
        let later = Instant::now() + Duration::from_secs(60);
        assert!(mgr.notifications[0].is_live(later));
        mgr.dismiss_all();
        assert!(!mgr.has_notifications());
    }

    #[test]
    fn test_oldest_dropped_past_limit() {
        let mut mgr = NotificationManager::new();
        for i in 0..(MAX_VISIBLE + 2) {
            mgr.info(format!("n{}", i));
        }
        assert_eq!(mgr.notifications.len(), MAX_VISIBLE);
        assert_eq!(mgr.notifications[0].message, "n2");
    }
}

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Role, User};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("view '{0}' is not available for this user")]
    UnknownView(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Overview,
    Messages,
    Calendar,
    Profile,
    Grades,
    Students,
    Classes,
    Reports,
    Settings,
}

impl View {
    pub const ALL: [View; 9] = [
        View::Overview,
        View::Messages,
        View::Calendar,
        View::Profile,
        View::Grades,
        View::Students,
        View::Classes,
        View::Reports,
        View::Settings,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::Messages => "messages",
            View::Calendar => "calendar",
            View::Profile => "profile",
            View::Grades => "grades",
            View::Students => "students",
            View::Classes => "classes",
            View::Reports => "reports",
            View::Settings => "settings",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Messages => "Messages",
            View::Calendar => "Calendar",
            View::Profile => "Profile",
            View::Grades => "Grades",
            View::Students => "Students",
            View::Classes => "Classes",
            View::Reports => "Reports",
            View::Settings => "Settings",
        }
    }
}

impl FromStr for View {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.id() == s)
            .ok_or_else(|| DashboardError::UnknownView(s.to_string()))
    }
}

/// Sidebar entries for `role`, in display order.
pub fn navigation_for(role: Role) -> Vec<View> {
    let mut items = vec![View::Overview, View::Messages, View::Calendar, View::Profile];
    let extra: &[View] = match role {
        Role::Parent => &[View::Grades],
        Role::Teacher => &[View::Students, View::Grades],
        Role::Admin => &[View::Students, View::Classes, View::Reports],
    };
    items.splice(2..2, extra.iter().copied());
    items.push(View::Settings);
    items
}

/// Headline number on the overview page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStat {
    pub label: &'static str,
    pub value: u32,
}

pub fn summary_stat(role: Role) -> SummaryStat {
    match role {
        Role::Parent => SummaryStat {
            label: "Children",
            value: 2,
        },
        Role::Teacher => SummaryStat {
            label: "Students",
            value: 24,
        },
        Role::Admin => SummaryStat {
            label: "Total Users",
            value: 156,
        },
    }
}

/// Role-driven menu plus the currently shown view.
#[derive(Debug, Clone)]
pub struct Dashboard {
    user: User,
    menu: Vec<View>,
    active: View,
}

impl Dashboard {
    pub fn new(user: User) -> Self {
        let menu = navigation_for(user.role);
        Self {
            user,
            menu,
            active: View::Overview,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn menu(&self) -> &[View] {
        &self.menu
    }

    pub fn active(&self) -> View {
        self.active
    }

    pub fn select(&mut self, view: View) -> Result<(), DashboardError> {
        if !self.menu.contains(&view) {
            tracing::warn!(
                "{} tried to open {} which is not in the {} menu",
                self.user.id,
                view.id(),
                self.user.role
            );
            return Err(DashboardError::UnknownView(view.id().to_string()));
        }
        self.active = view;
        Ok(())
    }

    pub fn select_id(&mut self, id: &str) -> Result<(), DashboardError> {
        self.select(id.parse()?)
    }

    pub fn welcome(&self) -> String {
        format!("Welcome back, {}!", self.user.name)
    }

    pub fn summary(&self) -> SummaryStat {
        summary_stat(self.user.role)
    }
}

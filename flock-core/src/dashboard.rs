//! 角色到仪表盘的映射

use serde::{Deserialize, Serialize};

use crate::models::Role;

/// 客户端按角色渲染的仪表盘
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DashboardView {
    Admin,
    Bishop,
    Reverend,
    Overseer,
    SeniorPastor,
    Department,
    Member,
}

impl DashboardView {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => DashboardView::Admin,
            Role::Bishop => DashboardView::Bishop,
            Role::Reverend => DashboardView::Reverend,
            Role::Overseer => DashboardView::Overseer,
            Role::SeniorPastor => DashboardView::SeniorPastor,
            Role::DeptLeader => DashboardView::Department,
            Role::Member => DashboardView::Member,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DashboardView::Admin => "Administration",
            DashboardView::Bishop => "Bishop Overview",
            DashboardView::Reverend => "Reverend Overview",
            DashboardView::Overseer => "Overseer Overview",
            DashboardView::SeniorPastor => "Senior Pastor Overview",
            DashboardView::Department => "Department",
            DashboardView::Member => "My Dashboard",
        }
    }
}

//! 角色权限策略：操作 -> 允许的角色

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::models::Role;

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const DEPARTMENT_CREATORS: &[Role] = &[Role::Bishop, Role::Reverend, Role::Admin];
const DUTY_ASSIGNERS: &[Role] = &[
    Role::Bishop,
    Role::Reverend,
    Role::Overseer,
    Role::SeniorPastor,
    Role::DeptLeader,
    Role::Admin,
];
const REPORT_SUBMITTERS: &[Role] = &[Role::DeptLeader, Role::Admin];
const REPORT_VIEWERS: &[Role] = &[Role::Bishop, Role::Reverend, Role::Admin];

/// 受保护的操作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ManageUsers,
    CreateDepartment,
    UpdateDepartment,
    DeleteDepartment,
    CreateDuty,
    SubmitReport,
    ViewAllReports,
    ViewOwnDuties,
    RecordAttendance,
    ManageSickRecords,
    ViewFiles,
    RevokeToken,
    ViewProfile,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::ManageUsers,
        Operation::CreateDepartment,
        Operation::UpdateDepartment,
        Operation::DeleteDepartment,
        Operation::CreateDuty,
        Operation::SubmitReport,
        Operation::ViewAllReports,
        Operation::ViewOwnDuties,
        Operation::RecordAttendance,
        Operation::ManageSickRecords,
        Operation::ViewFiles,
        Operation::RevokeToken,
        Operation::ViewProfile,
    ];

    /// 允许的角色；`None` 表示任何已认证用户
    pub fn allowed_roles(self) -> Option<&'static [Role]> {
        match self {
            Operation::ManageUsers
            | Operation::UpdateDepartment
            | Operation::DeleteDepartment => Some(ADMIN_ONLY),
            Operation::CreateDepartment => Some(DEPARTMENT_CREATORS),
            Operation::CreateDuty => Some(DUTY_ASSIGNERS),
            Operation::SubmitReport => Some(REPORT_SUBMITTERS),
            Operation::ViewAllReports => Some(REPORT_VIEWERS),
            Operation::ViewOwnDuties
            | Operation::RecordAttendance
            | Operation::ManageSickRecords
            | Operation::ViewFiles
            | Operation::RevokeToken
            | Operation::ViewProfile => None,
        }
    }

    pub fn permits(self, role: Role) -> bool {
        permits(role, self.allowed_roles())
    }
}

/// 角色是否在允许列表内（无列表则放行）
pub fn permits(role: Role, allowed: Option<&[Role]>) -> bool {
    match allowed {
        None => true,
        Some(roles) => roles.contains(&role),
    }
}

/// 校验角色，不在允许列表内返回 Forbidden
pub fn authorize(role: Role, allowed: Option<&[Role]>) -> Result<()> {
    if permits(role, allowed) {
        return Ok(());
    }
    Err(AuthError::Forbidden(format!(
        "User role {} is not authorized to access this route",
        role
    )))
}

/// 角色可执行的全部操作
pub fn operations_for(role: Role) -> Vec<Operation> {
    Operation::ALL
        .into_iter()
        .filter(|op| op.permits(role))
        .collect()
}

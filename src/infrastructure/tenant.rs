//! 租户路径解析 - 基础设施层
//!
//! 所有"考试 + 老师"到目录名的推导都必须经过这里。
//! 批处理脚本用同样的规则创建目录，任何一处推导不一致都会导致读不到数据。

use crate::error::AppError;
use std::fmt::Display;

/// 考试名称为空时使用的占位名称（与批处理脚本保持一致）
pub const UNNAMED_EXAM: &str = "未命名考试";

/// 目录名中不允许出现的字符
const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// 去掉路径非法字符并去除首尾空白
pub fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// 由考试名称和老师账号推导考试目录名
///
/// 规则：
/// 1. 考试名称去掉非法字符并 trim，为空时使用 [`UNNAMED_EXAM`]
/// 2. 老师账号同样清洗；非空且考试名称尚未以 `_<老师>` 结尾时追加后缀
///
/// 纯函数，永不失败；对自身输出再次调用结果不变
pub fn resolve_tenant_dir_name(exam_name: &str, teacher_id: &str) -> String {
    let mut folder = sanitize_segment(exam_name);
    if folder.is_empty() {
        folder = UNNAMED_EXAM.to_string();
    }

    let teacher = sanitize_segment(teacher_id);
    if !teacher.is_empty() {
        let suffix = format!("_{}", teacher);
        if !folder.ends_with(&suffix) {
            folder.push_str(&suffix);
        }
    }

    folder
}

/// 租户键：一场考试 + 一位老师
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantKey {
    pub exam_name: String,
    pub teacher_username: String,
}

impl TenantKey {
    pub fn new(exam_name: impl Into<String>, teacher_username: impl Into<String>) -> Self {
        Self {
            exam_name: exam_name.into(),
            teacher_username: teacher_username.into(),
        }
    }

    /// 对应的考试目录
    pub fn folder(&self) -> TenantFolder {
        TenantFolder(resolve_tenant_dir_name(
            &self.exam_name,
            &self.teacher_username,
        ))
    }
}

/// 已校验的考试目录名
///
/// 只能由 [`TenantKey::folder`] 推导或由 [`TenantFolder::parse`] 校验得到，
/// 保证可以安全地拼接到输出目录下
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantFolder(String);

impl TenantFolder {
    /// 校验客户端传入的目录名
    ///
    /// 目录名必须已经是清洗后的形式，且不能是 `.` / `..`
    pub fn parse(name: &str) -> Result<Self, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::invalid_request("缺少文件夹名称参数"));
        }
        let is_clean = sanitize_segment(name) == name
            && name != "."
            && name != ".."
            && !name.chars().any(char::is_control);
        if !is_clean {
            return Err(AppError::invalid_request(format!(
                "文件夹名称无效: {}",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 目录属于该老师时返回去掉 `_<老师>` 后缀的考试名称
    ///
    /// 只认结尾的后缀，`期中_t10` 不属于 `t1`
    pub fn owned_exam_name(&self, teacher_username: &str) -> Option<&str> {
        let teacher = sanitize_segment(teacher_username);
        if teacher.is_empty() {
            return None;
        }
        self.0.strip_suffix(&format!("_{}", teacher))
    }

    /// 去掉 `_<老师>` 后缀后的考试名称，不属于该老师时原样返回
    pub fn exam_name_for(&self, teacher_username: &str) -> String {
        self.owned_exam_name(teacher_username)
            .unwrap_or(&self.0)
            .to_string()
    }
}

impl Display for TenantFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

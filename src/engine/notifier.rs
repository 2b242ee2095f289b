// ==========================================
// 产品评审分配系统 - 分配通知
// ==========================================
// 职责: 定义分配通知 trait,实现依赖倒置
// 红线: 通知失败只记日志,不影响提交结果
// ==========================================

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

use crate::i18n::{t, t_with_args};

/// 通知正文中最多列出的产品名数量,超出部分折叠为"等 N 个"
pub const DEFAULT_PRODUCT_NAME_LIMIT: usize = 5;

// ==========================================
// AssignmentNotice - 分配通知内容
// ==========================================
// 每个评审人每次提交一条,邮件式外发消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentNotice {
    pub reviewer_id: String,
    pub reviewer_email: String,
    pub round_name: String,
    pub product_names: Vec<String>,
    pub deadline: Option<NaiveDate>,
}

impl AssignmentNotice {
    /// 通知标题
    pub fn subject(&self) -> String {
        t_with_args("notify.assignment_subject", &[("round", &self.round_name)])
    }

    /// 通知正文,产品名列表超过 name_limit 时截断
    pub fn body(&self, name_limit: usize) -> String {
        let shown: Vec<&str> = self
            .product_names
            .iter()
            .take(name_limit)
            .map(|s| s.as_str())
            .collect();
        let mut products = shown.join(", ");

        let hidden = self.product_names.len().saturating_sub(name_limit);
        if hidden > 0 {
            let more = t_with_args("notify.and_n_more", &[("n", &hidden.to_string())]);
            products.push_str(&format!(" {}", more));
        }

        let deadline = self
            .deadline
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| t("notify.no_deadline"));

        t_with_args(
            "notify.assignment_body",
            &[
                ("round", &self.round_name),
                ("count", &self.product_names.len().to_string()),
                ("products", &products),
                ("deadline", &deadline),
            ],
        )
    }
}

// ==========================================
// 通知 Trait
// ==========================================

/// 分配通知发送者 Trait
///
/// 引擎层只定义接口,真正的外发通道 (邮件/IM) 由上层实现。
/// 提交流程对通知是 fire-and-forget: 失败记日志,不重试,不回滚。
#[async_trait]
pub trait AssignmentNotifier: Send + Sync {
    /// 发送一条分配通知
    async fn notify(&self, notice: &AssignmentNotice)
        -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作通知器,用于不需要外发的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl AssignmentNotifier for NoOpNotifier {
    async fn notify(
        &self,
        notice: &AssignmentNotice,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpNotifier: 跳过通知 - reviewer={}, round={}",
            notice.reviewer_id,
            notice.round_name
        );
        Ok(())
    }
}

/// 日志通知器
///
/// 没有接入真实外发通道时的缺省实现,把通知内容完整写进结构化日志
#[derive(Debug, Clone)]
pub struct LogNotifier {
    name_limit: usize,
}

impl LogNotifier {
    /// # 参数
    /// - name_limit: 正文中最多列出的产品名数量
    pub fn with_name_limit(name_limit: usize) -> Self {
        Self { name_limit }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self {
            name_limit: DEFAULT_PRODUCT_NAME_LIMIT,
        }
    }
}

#[async_trait]
impl AssignmentNotifier for LogNotifier {
    async fn notify(
        &self,
        notice: &AssignmentNotice,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::info!(
            reviewer_id = %notice.reviewer_id,
            email = %notice.reviewer_email,
            subject = %notice.subject(),
            body = %notice.body(self.name_limit),
            "发送分配通知"
        );
        Ok(())
    }
}

/// 可选的通知器包装
///
/// 简化 Option<Arc<dyn AssignmentNotifier>> 的使用
pub struct OptionalNotifier {
    inner: Option<Arc<dyn AssignmentNotifier>>,
}

impl OptionalNotifier {
    /// 创建带通知器的实例
    pub fn with_notifier(notifier: Arc<dyn AssignmentNotifier>) -> Self {
        Self {
            inner: Some(notifier),
        }
    }

    /// 创建空实例（不发送通知）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发送通知（如果配置了通知器）
    pub async fn notify(
        &self,
        notice: &AssignmentNotice,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(notifier) => notifier.notify(notice).await,
            None => {
                tracing::debug!(
                    "OptionalNotifier: 未配置通知器,跳过 - reviewer={}",
                    notice.reviewer_id
                );
                Ok(())
            }
        }
    }

    /// 检查是否配置了通知器
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalNotifier {
    fn default() -> Self {
        Self::none()
    }
}

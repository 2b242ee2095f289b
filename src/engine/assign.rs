// ==========================================
// 产品评审分配系统 - 分配预览引擎
// ==========================================
// 红线: 公平约束优先于匹配偏好
// ==========================================
// 职责: 纯内存计算分配方案,不读库不写库
// 输入: 待分配产品 + 评审人快照 (当前工作量 + 专长)
// 输出: 分配预览 (可反复试算,提交与否由调用方决定)
// ==========================================

use crate::domain::product::Product;
use crate::domain::reviewer::ExpertiseEntry;
use crate::engine::affinity::{AffinityScore, AffinityScorer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

// ==========================================
// ReviewerSnapshot - 评审人快照
// ==========================================
// 分配计算所需的评审人侧全部事实,由调用方从仓储组装
#[derive(Debug, Clone)]
pub struct ReviewerSnapshot {
    pub reviewer_id: String,
    /// 跨轮次的未完结评审数 (PENDING / IN_PROGRESS)
    pub current_workload: i64,
    pub expertise: Vec<ExpertiseEntry>,
}

/// 预览中的单条分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewAssignment {
    pub product_id: String,
    pub reviewer_id: String,
    pub score: AffinityScore,
}

/// 每人预计分配量区间 (均分语义下的上下界)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedRange {
    pub min: i64,
    pub max: i64,
}

/// 分配预览结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentPreview {
    pub assignments: Vec<PreviewAssignment>,
    /// 本次新增分配的按人计数 (不含既有工作量)
    pub per_reviewer_counts: HashMap<String, i64>,
    pub estimated_range: EstimatedRange,
}

// ==========================================
// AssignmentEngine - 分配预览引擎
// ==========================================
pub struct AssignmentEngine {
    scorer: AffinityScorer,
}

/// 逐产品分配时的评审人工作量台账
struct ProjectedLoad {
    reviewer_id: String,
    /// 既有未完结数 + 本次已分配数
    projected: i64,
    /// 本次已分配数
    new_count: i64,
}

impl AssignmentEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {
            scorer: AffinityScorer::new(),
        }
    }

    /// 计算分配预览
    ///
    /// 两阶段算法:
    /// 1) 贪心阶段: 产品按 (category, company, product_id) 稳定排序后逐个分配,
    ///    在预计量 (既有未完结 + 本次新增) 不超公平上限的候选人中取匹配分最小者,
    ///    平分依次比预计量、reviewer_id;候选人为空时退化为全局预计量最小者。
    ///    公平上限 = ceil((既有未完结总量 + 新增产品数) / 评审人数)
    /// 2) 回填阶段: 只要 (可回填的) 最高预计量与最低预计量差值超过 1,
    ///    就从高者手中把对低者匹配最好的一个新增产品挪给低者。
    ///    既有工作量无法挪动,差值因此收不到 1 以内时保持现状。
    ///
    /// 约束: 评审人列表非空由调用方校验,入参为空时返回空预览
    ///
    /// # 参数
    /// - `products`: 待分配产品 (调用方已去重)
    /// - `reviewers`: 参与本轮的评审人快照
    ///
    /// # 返回
    /// 分配预览,相同输入必得到相同输出
    #[instrument(skip(self, products, reviewers), fields(
        product_count = products.len(),
        reviewer_count = reviewers.len()
    ))]
    pub fn compute_preview(
        &self,
        products: &[Product],
        reviewers: &[ReviewerSnapshot],
    ) -> AssignmentPreview {
        let total_new = products.len() as i64;
        let reviewer_count = reviewers.len() as i64;

        if reviewer_count == 0 {
            return AssignmentPreview {
                assignments: Vec::new(),
                per_reviewer_counts: HashMap::new(),
                estimated_range: EstimatedRange { min: 0, max: 0 },
            };
        }

        let mut sorted_products: Vec<&Product> = products.iter().collect();
        sorted_products.sort_by_key(|p| p.sort_key());

        let existing_total: i64 = reviewers.iter().map(|r| r.current_workload).sum();
        let ceiling = Self::div_ceil(existing_total + total_new, reviewer_count);

        let expertise_by_reviewer: HashMap<&str, &[ExpertiseEntry]> = reviewers
            .iter()
            .map(|r| (r.reviewer_id.as_str(), r.expertise.as_slice()))
            .collect();

        let mut loads: Vec<ProjectedLoad> = reviewers
            .iter()
            .map(|r| ProjectedLoad {
                reviewer_id: r.reviewer_id.clone(),
                projected: r.current_workload,
                new_count: 0,
            })
            .collect();

        // 阶段一: 贪心分配,chosen[i] 是第 i 个产品落到的 loads 下标
        let mut chosen: Vec<usize> = Vec::with_capacity(sorted_products.len());
        for product in &sorted_products {
            let idx = self.choose_reviewer(product, &loads, &expertise_by_reviewer, ceiling);
            loads[idx].projected += 1;
            loads[idx].new_count += 1;
            chosen.push(idx);
        }

        // 阶段二: 回填,把新增产品从过载者挪向欠载者
        self.backfill(&sorted_products, &mut chosen, &mut loads, &expertise_by_reviewer);

        let assignments = sorted_products
            .iter()
            .zip(chosen.iter())
            .map(|(product, &idx)| {
                let reviewer_id = loads[idx].reviewer_id.clone();
                let expertise = expertise_by_reviewer
                    .get(reviewer_id.as_str())
                    .copied()
                    .unwrap_or(&[]);
                PreviewAssignment {
                    product_id: product.product_id.clone(),
                    reviewer_id,
                    score: self.scorer.score(expertise, product),
                }
            })
            .collect();

        let per_reviewer_counts = loads
            .iter()
            .map(|l| (l.reviewer_id.clone(), l.new_count))
            .collect();

        AssignmentPreview {
            assignments,
            per_reviewer_counts,
            estimated_range: EstimatedRange {
                min: total_new / reviewer_count,
                max: Self::div_ceil(total_new, reviewer_count),
            },
        }
    }

    /// 为单个产品挑选评审人,返回 loads 中的下标
    fn choose_reviewer(
        &self,
        product: &Product,
        loads: &[ProjectedLoad],
        expertise_by_reviewer: &HashMap<&str, &[ExpertiseEntry]>,
        ceiling: i64,
    ) -> usize {
        let best_under_ceiling = loads
            .iter()
            .enumerate()
            .filter(|(_, load)| load.projected + 1 <= ceiling)
            .min_by_key(|(_, load)| {
                let expertise = expertise_by_reviewer
                    .get(load.reviewer_id.as_str())
                    .copied()
                    .unwrap_or(&[]);
                (
                    self.scorer.score(expertise, product),
                    load.projected,
                    load.reviewer_id.clone(),
                )
            })
            .map(|(idx, _)| idx);

        // 全员到达上限时公平性优先,忽略匹配分
        best_under_ceiling.unwrap_or_else(|| {
            loads
                .iter()
                .enumerate()
                .min_by_key(|(_, load)| (load.projected, load.reviewer_id.clone()))
                .map(|(idx, _)| idx)
                .unwrap_or(0)
        })
    }

    /// 回填: 反复把一个新增产品从预计量最高的评审人挪给最低的
    ///
    /// 挪动对象取对接收方匹配分最好的产品 (平分比 product_id)。
    /// 最高者手里没有可挪的新增产品、或差值已收敛到 1 以内时停止。
    fn backfill(
        &self,
        sorted_products: &[&Product],
        chosen: &mut [usize],
        loads: &mut [ProjectedLoad],
        expertise_by_reviewer: &HashMap<&str, &[ExpertiseEntry]>,
    ) {
        loop {
            let hi = match loads
                .iter()
                .enumerate()
                .filter(|(_, load)| load.new_count > 0)
                .max_by(|(_, a), (_, b)| {
                    a.projected
                        .cmp(&b.projected)
                        .then(b.reviewer_id.cmp(&a.reviewer_id))
                }) {
                Some((idx, _)) => idx,
                None => return,
            };

            let lo = match loads
                .iter()
                .enumerate()
                .min_by_key(|(_, load)| (load.projected, load.reviewer_id.clone()))
            {
                Some((idx, _)) => idx,
                None => return,
            };

            if loads[hi].projected - loads[lo].projected <= 1 {
                return;
            }

            let lo_expertise = expertise_by_reviewer
                .get(loads[lo].reviewer_id.as_str())
                .copied()
                .unwrap_or(&[]);

            let moved = chosen
                .iter()
                .enumerate()
                .filter(|(_, &owner)| owner == hi)
                .min_by_key(|(i, _)| {
                    (
                        self.scorer.score(lo_expertise, sorted_products[*i]),
                        sorted_products[*i].product_id.as_str(),
                    )
                })
                .map(|(i, _)| i);

            match moved {
                Some(i) => {
                    chosen[i] = lo;
                    loads[hi].projected -= 1;
                    loads[hi].new_count -= 1;
                    loads[lo].projected += 1;
                    loads[lo].new_count += 1;
                }
                None => return,
            }
        }
    }

    fn div_ceil(numerator: i64, denominator: i64) -> i64 {
        (numerator + denominator - 1) / denominator
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for AssignmentEngine {
    fn default() -> Self {
        Self::new()
    }
}

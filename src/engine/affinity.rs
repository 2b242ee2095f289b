// ==========================================
// 产品评审分配系统 - 专长匹配评分引擎
// ==========================================
// 职责: 计算评审人对产品的匹配分
// 输入: 评审人的专长条目 + 产品
// 输出: 匹配分 (越小越匹配)
// ==========================================

use crate::domain::product::Product;
use crate::domain::reviewer::ExpertiseEntry;
use crate::domain::types::ExpertiseScope;
use serde::{Deserialize, Serialize};

/// 无任何专长命中时的匹配分,比最弱的声明优先级 (10) 还差一档
pub const NO_MATCH_PRIORITY: i32 = 11;

// ==========================================
// AffinityScore - 匹配分
// ==========================================
// 排序键: 先比优先级,优先级相同时更具体的范围胜出
// (PRODUCT < COMPANY < CATEGORY < 无命中)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AffinityScore {
    pub priority: i32,
    pub scope_rank: i32,
}

impl AffinityScore {
    /// 无命中评分
    pub fn no_match() -> Self {
        Self {
            priority: NO_MATCH_PRIORITY,
            scope_rank: ExpertiseScope::NO_MATCH_RANK,
        }
    }

    /// 是否命中了某条声明的专长
    pub fn is_match(&self) -> bool {
        self.priority < NO_MATCH_PRIORITY
    }

    /// 对外暴露的数值形式,持久化到 product_review.match_score
    pub fn as_match_score(&self) -> i32 {
        self.priority
    }
}

// ==========================================
// AffinityScorer - 匹配评分引擎
// ==========================================
pub struct AffinityScorer {
    // 无状态引擎,不需要注入依赖
}

impl AffinityScorer {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 计算一名评审人对一个产品的匹配分
    ///
    /// 规则:
    /// 1) 逐条检查专长是否命中产品 (PRODUCT 比 product_id,
    ///    COMPANY 比 company, CATEGORY 比 category)
    /// 2) 在命中的条目中取 (priority, scope_rank) 最小者
    /// 3) 一条都没命中时返回 no_match (priority=11)
    ///
    /// # 参数
    /// - `expertise`: 该评审人的全部专长条目
    /// - `product`: 待评审产品
    ///
    /// # 返回
    /// 匹配分,越小代表匹配越强
    pub fn score(&self, expertise: &[ExpertiseEntry], product: &Product) -> AffinityScore {
        expertise
            .iter()
            .filter_map(|entry| Self::match_entry(entry, product))
            .min()
            .unwrap_or_else(AffinityScore::no_match)
    }

    /// 单条专长的命中判定
    ///
    /// # 返回
    /// - `Some(score)`: 命中
    /// - `None`: 未命中
    fn match_entry(entry: &ExpertiseEntry, product: &Product) -> Option<AffinityScore> {
        let hit = match entry.scope {
            ExpertiseScope::Product => entry.expertise_key == product.product_id,
            ExpertiseScope::Company => entry.expertise_key == product.company,
            ExpertiseScope::Category => entry.expertise_key == product.category,
        };

        hit.then_some(AffinityScore {
            priority: entry.priority,
            scope_rank: entry.scope.specificity_rank(),
        })
    }

    /// 生成匹配原因 (可解释性,随审计记录落库)
    ///
    /// # 返回
    /// JSON 格式的匹配原因字符串
    pub fn generate_match_reason(&self, score: &AffinityScore) -> String {
        let matched_scope = match score.scope_rank {
            r if r == ExpertiseScope::Product.specificity_rank() => "PRODUCT",
            r if r == ExpertiseScope::Company.specificity_rank() => "COMPANY",
            r if r == ExpertiseScope::Category.specificity_rank() => "CATEGORY",
            _ => "NONE",
        };

        format!(
            r#"{{"match_score":{},"scope_rank":{},"matched_scope":"{}"}}"#,
            score.priority, score.scope_rank, matched_scope
        )
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for AffinityScorer {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn make_product(product_id: &str, category: &str, company: &str) -> Product {
        Product {
            product_id: product_id.to_string(),
            name: format!("产品 {}", product_id),
            category: category.to_string(),
            company: company.to_string(),
        }
    }

    fn make_expertise(scope: ExpertiseScope, key: &str, priority: i32) -> ExpertiseEntry {
        ExpertiseEntry {
            reviewer_id: "rev-a".to_string(),
            scope,
            expertise_key: key.to_string(),
            priority,
        }
    }

    #[test]
    fn test_lowest_priority_wins() {
        let scorer = AffinityScorer::new();
        let product = make_product("p1", "CT", "联影");

        let expertise = vec![
            make_expertise(ExpertiseScope::Category, "CT", 5),
            make_expertise(ExpertiseScope::Category, "CT", 2),
        ];

        // 表内 (reviewer, scope, key) 唯一,此处模拟不同 key 下的多条命中
        let score = scorer.score(&expertise, &product);
        assert_eq!(score.priority, 2);
        assert!(score.is_match());
    }

    #[test]
    fn test_specific_scope_beats_general_on_priority_tie() {
        let scorer = AffinityScorer::new();
        let product = make_product("p1", "CT", "联影");

        let expertise = vec![
            make_expertise(ExpertiseScope::Category, "CT", 3),
            make_expertise(ExpertiseScope::Product, "p1", 3),
            make_expertise(ExpertiseScope::Company, "联影", 3),
        ];

        let score = scorer.score(&expertise, &product);
        assert_eq!(score.priority, 3);
        assert_eq!(score.scope_rank, ExpertiseScope::Product.specificity_rank());
    }

    #[test]
    fn test_no_match_scores_priority_11() {
        let scorer = AffinityScorer::new();
        let product = make_product("p1", "CT", "联影");

        // key 不匹配的条目不命中
        let expertise = vec![make_expertise(ExpertiseScope::Category, "MRI", 1)];
        let score = scorer.score(&expertise, &product);
        assert_eq!(score.priority, NO_MATCH_PRIORITY);
        assert!(!score.is_match());

        // 没有任何专长条目时同样是 no_match
        let score = scorer.score(&[], &product);
        assert_eq!(score, AffinityScore::no_match());
    }

    #[test]
    fn test_score_ordering_is_lexicographic() {
        let strong_specific = AffinityScore {
            priority: 1,
            scope_rank: 0,
        };
        let strong_general = AffinityScore {
            priority: 1,
            scope_rank: 2,
        };
        let weak = AffinityScore {
            priority: 9,
            scope_rank: 0,
        };

        assert!(strong_specific < strong_general);
        assert!(strong_general < weak);
        assert!(weak < AffinityScore::no_match());
    }

    #[test]
    fn test_generate_match_reason_names_scope() {
        let scorer = AffinityScorer::new();
        let product = make_product("p1", "CT", "联影");
        let expertise = vec![make_expertise(ExpertiseScope::Company, "联影", 4)];

        let score = scorer.score(&expertise, &product);
        let reason = scorer.generate_match_reason(&score);
        assert!(reason.contains(r#""match_score":4"#));
        assert!(reason.contains(r#""matched_scope":"COMPANY""#));
    }
}

// ==========================================
// 完整分配业务流程端到端集成测试
// ==========================================
// 目标: 验证从目录导入到轮次导出的完整业务流程
// 覆盖: CatalogApi → ReviewerApi → AssignmentApi → RoundApi → 审计回放
// ==========================================


#[cfg(test)]
mod assignment_flow_e2e_test {
    use crate::test_helpers::{create_test_db, open_test_connection};
    use product_review_assign::api::{
        AssignmentApi, CatalogApi, ReviewerApi, RoundApi,
    };
    use product_review_assign::config::ConfigManager;
    use product_review_assign::domain::types::ReviewStatus;
    use product_review_assign::engine::{LogNotifier, OptionalNotifier};
    use product_review_assign::repository::{
        AssignmentHistoryRepository, ProductRepository, ProductReviewRepository,
        ReviewRoundRepository, ReviewerRepository,
    };
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建完整测试环境（包含全部 API）
    fn setup_full_test_env() -> (
        NamedTempFile,
        String,
        CatalogApi,
        ReviewerApi,
        AssignmentApi,
        RoundApi,
        Arc<AssignmentHistoryRepository>,
        Arc<ProductReviewRepository>,
    ) {
        let (temp_file, db_path) = create_test_db().unwrap();
        let conn = Arc::new(Mutex::new(open_test_connection(&db_path).unwrap()));

        // === Repository 层 ===
        let product_repo = Arc::new(ProductRepository::new(conn.clone()));
        let reviewer_repo = Arc::new(ReviewerRepository::new(conn.clone()));
        let round_repo = Arc::new(ReviewRoundRepository::new(conn.clone()));
        let review_repo = Arc::new(ProductReviewRepository::new(conn.clone()));
        let history_repo = Arc::new(AssignmentHistoryRepository::new(conn.clone()));

        // === API 层 ===
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
        let notifier = OptionalNotifier::with_notifier(Arc::new(LogNotifier::default()));
        let assignment_api = AssignmentApi::new(
            product_repo.clone(),
            reviewer_repo.clone(),
            review_repo.clone(),
            round_repo.clone(),
            config_manager,
            notifier,
        );
        let reviewer_api = ReviewerApi::new(reviewer_repo.clone(), review_repo.clone());
        let round_api = RoundApi::new(
            round_repo,
            review_repo.clone(),
            history_repo.clone(),
            product_repo.clone(),
            reviewer_repo,
        );
        let catalog_api = CatalogApi::new(product_repo);

        (
            temp_file,
            db_path,
            catalog_api,
            reviewer_api,
            assignment_api,
            round_api,
            history_repo,
            review_repo,
        )
    }

    // ==========================================
    // 测试场景1: 完整业务流程（目录导入 → 分配 → 导出）
    // ==========================================

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_flow_import_to_export() {
        println!("\n=== 端到端集成测试：完整分配业务流程 ===\n");

        // 1. 初始化测试环境
        let (
            _temp_file,
            _db_path,
            catalog_api,
            reviewer_api,
            assignment_api,
            round_api,
            history_repo,
            _review_repo,
        ) = setup_full_test_env();
        println!("✓ 步骤 1: 测试环境已初始化");

        // 2. 导入产品目录
        let summary = catalog_api
            .import_catalog_file("tests/fixtures/catalog_normal.csv", "e2e")
            .expect("目录导入失败");
        assert_eq!(summary.total_rows, 10, "目录文件应有10个数据行");
        assert_eq!(summary.inserted, 10, "首次导入应全部新增");
        assert_eq!(summary.failed, 0, "不应该有失败行");
        println!(
            "✓ 步骤 2: 目录导入完成（新增: {}, 总计: {}）",
            summary.inserted, summary.total_rows
        );

        // 3. 登记评审人与专长
        reviewer_api
            .create_reviewer("rev-zhang", "张工", "zhang@example.com")
            .expect("登记评审人失败");
        reviewer_api
            .add_expertise("rev-zhang", "CATEGORY", "规划软件", 1)
            .expect("登记专长失败");
        reviewer_api
            .add_expertise("rev-zhang", "COMPANY", "华仪医疗", 2)
            .expect("登记专长失败");
        reviewer_api
            .create_reviewer("rev-li", "李工", "li@example.com")
            .expect("登记评审人失败");
        reviewer_api
            .add_expertise("rev-li", "CATEGORY", "质控软件", 1)
            .expect("登记专长失败");
        reviewer_api
            .create_reviewer("rev-wang", "王工", "wang@example.com")
            .expect("登记评审人失败");
        println!("✓ 步骤 3: 评审人登记完成（3 人）");

        // 4. 计算分配预览
        let product_ids: Vec<String> = (1..=10).map(|i| format!("P-10{:02}", i)).collect();
        let reviewer_ids: Vec<String> = vec![
            "rev-zhang".to_string(),
            "rev-li".to_string(),
            "rev-wang".to_string(),
        ];
        let preview = assignment_api
            .preview_assignments(&product_ids, &reviewer_ids)
            .expect("计算预览失败");
        assert_eq!(preview.assignments.len(), 10, "10个产品应全部进入预览");
        assert_eq!(preview.estimated_range.min, 3);
        assert_eq!(preview.estimated_range.max, 4);
        let mut new_counts: Vec<i64> = preview.per_reviewer_counts.values().copied().collect();
        new_counts.sort_unstable();
        assert_eq!(new_counts, vec![3, 3, 4], "10件3人应分成 3/3/4");
        println!(
            "✓ 步骤 4: 分配预览完成（分配数: {}, 区间: {}..{}）",
            preview.assignments.len(),
            preview.estimated_range.min,
            preview.estimated_range.max
        );

        // 5. 提交评审轮次
        let committed = assignment_api
            .commit_assignments(&preview, "三月第一轮评审", None, "admin")
            .await
            .expect("提交轮次失败");
        assert_eq!(committed.round_no, 1, "首个轮次号应为1");
        assert_eq!(committed.review_count, 10);
        assert_eq!(committed.notified_reviewers, 3, "3名评审人都应收到通知");
        println!(
            "✓ 步骤 5: 轮次已提交（round_no: {}, 评审行: {}, 通知: {}）",
            committed.round_no, committed.review_count, committed.notified_reviewers
        );

        // 6. 查询轮次详情
        let detail = round_api
            .round_detail(&committed.round_id)
            .expect("查询轮次详情失败");
        assert_eq!(detail.reviews.len(), 10);
        assert!(
            detail.reviews.iter().all(|r| r.is_assigned()),
            "提交后所有评审行都应已分配"
        );
        let unassigned = round_api
            .list_unassigned_products(&committed.round_id)
            .expect("查询未分配产品失败");
        assert!(unassigned.is_empty(), "不应该有未分配产品");
        println!("✓ 步骤 6: 轮次详情核对完成（{} 行全部已分配）", detail.reviews.len());

        // 7. 改派一个产品
        let first = preview.assignments[0].clone();
        let new_reviewer = reviewer_ids
            .iter()
            .find(|id| **id != first.reviewer_id)
            .expect("应存在可改派的评审人");
        assignment_api
            .reassign_product(
                &committed.round_id,
                &first.product_id,
                new_reviewer,
                "admin",
                Some("专长更合适".to_string()),
            )
            .expect("改派失败");
        println!(
            "✓ 步骤 7: 产品 {} 已改派（{} → {}）",
            first.product_id, first.reviewer_id, new_reviewer
        );

        // 8. 取消一个产品的分配
        let second = preview.assignments[1].clone();
        assignment_api
            .unassign_product(
                &committed.round_id,
                &second.product_id,
                "admin",
                Some("暂缓评审".to_string()),
            )
            .expect("取消分配失败");
        println!("✓ 步骤 8: 产品 {} 已取消分配", second.product_id);

        // 9. 审计回放: 按 changed_at 升序回放应还原当前 assigned_to
        let detail = round_api
            .round_detail(&committed.round_id)
            .expect("查询轮次详情失败");
        for review in &detail.reviews {
            let entries = history_repo
                .history_for_product(&committed.round_id, &review.product_id)
                .expect("查询产品审计记录失败");
            let mut replayed: Option<String> = None;
            for entry in &entries {
                replayed = entry.apply_to(replayed);
            }
            assert_eq!(
                replayed, review.assigned_to,
                "产品 {} 的审计回放结果与当前分配不一致",
                review.product_id
            );
        }
        let round_history = round_api
            .history_for_round(&committed.round_id)
            .expect("查询轮次审计记录失败");
        assert_eq!(
            round_history.len(),
            12,
            "应有10条初始分配 + 1条改派 + 1条取消"
        );
        println!("✓ 步骤 9: 审计回放通过（{} 条记录）", round_history.len());

        // 10. 导出轮次 CSV
        let csv_text = round_api
            .export_round_csv(&committed.round_id)
            .expect("导出CSV失败");
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(lines.len(), 11, "表头 + 10个数据行");
        assert!(lines[0].starts_with("Round Name,Round Number,Product ID"));
        println!("✓ 步骤 10: CSV 导出完成（{} 行）", lines.len() - 1);

        println!("\n=== 完整分配业务流程测试通过 ✅ ===");
        println!("  - 目录导入: {} 条", summary.inserted);
        println!("  - 评审行: {} 条", committed.review_count);
        println!("  - 审计记录: {} 条", round_history.len());
    }

    // ==========================================
    // 测试场景2: 多轮次编号与工作量联动
    // ==========================================

    #[tokio::test(flavor = "multi_thread")]
    async fn test_multi_round_numbering_and_workload() {
        println!("\n=== 端到端集成测试：多轮次编号与工作量联动 ===\n");

        let (
            _temp_file,
            _db_path,
            catalog_api,
            reviewer_api,
            assignment_api,
            round_api,
            _history_repo,
            _review_repo,
        ) = setup_full_test_env();
        catalog_api
            .import_catalog_file("tests/fixtures/catalog_normal.csv", "e2e")
            .expect("目录导入失败");
        reviewer_api
            .create_reviewer("rev-solo", "单人评审", "solo@example.com")
            .expect("登记评审人失败");
        println!("✓ 步骤 1: 目录与评审人已就绪");

        // 2. 第一轮: 3个产品全部分给 rev-solo
        let first_batch: Vec<String> =
            vec!["P-1001".into(), "P-1002".into(), "P-1003".into()];
        let reviewer_ids = vec!["rev-solo".to_string()];
        let preview = assignment_api
            .preview_assignments(&first_batch, &reviewer_ids)
            .expect("计算预览失败");
        let round_a = assignment_api
            .commit_assignments(&preview, "第一批评审", None, "admin")
            .await
            .expect("提交第一轮失败");
        assert_eq!(round_a.round_no, 1);
        println!("✓ 步骤 2: 第一轮已提交（round_no: {}）", round_a.round_no);

        // 3. 第二轮: 再提交2个产品,轮次号递增
        let second_batch: Vec<String> = vec!["P-1004".into(), "P-1005".into()];
        let preview = assignment_api
            .preview_assignments(&second_batch, &reviewer_ids)
            .expect("计算预览失败");
        let round_b = assignment_api
            .commit_assignments(&preview, "第二批评审", None, "admin")
            .await
            .expect("提交第二轮失败");
        assert_eq!(round_b.round_no, 2, "轮次号应单调递增");
        println!("✓ 步骤 3: 第二轮已提交（round_no: {}）", round_b.round_no);

        // 4. 轮次名录: 最新在前,计数正确
        let rounds = round_api.list_rounds().expect("查询轮次名录失败");
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].round_no, 2, "名录应最新轮次在前");
        assert_eq!(rounds[0].review_count, 2);
        assert_eq!(rounds[1].review_count, 3);
        println!("✓ 步骤 4: 轮次名录核对完成");

        // 5. 在途工作量跨轮次累计
        let reviewers = reviewer_api.list_reviewers().expect("查询评审人失败");
        assert_eq!(reviewers.len(), 1);
        assert_eq!(
            reviewers[0].current_workload, 5,
            "两轮共5条在途评审都应计入工作量"
        );
        println!(
            "✓ 步骤 5: 在途工作量核对完成（{} 条）",
            reviewers[0].current_workload
        );

        // 6. 完结一条评审后工作量下降
        round_api
            .update_review_status(&round_a.round_id, "P-1001", "IN_PROGRESS", "rev-solo")
            .expect("状态流转失败");
        round_api
            .update_review_status(&round_a.round_id, "P-1001", "COMPLETED", "rev-solo")
            .expect("状态流转失败");
        let detail = round_api
            .round_detail(&round_a.round_id)
            .expect("查询轮次详情失败");
        let completed = detail
            .reviews
            .iter()
            .find(|r| r.product_id == "P-1001")
            .expect("应能找到 P-1001 的评审行");
        assert_eq!(completed.status, ReviewStatus::Completed);

        let reviewers = reviewer_api.list_reviewers().expect("查询评审人失败");
        assert_eq!(
            reviewers[0].current_workload, 4,
            "COMPLETED 状态不再计入在途工作量"
        );
        println!("✓ 步骤 6: 完结后工作量下降（{} 条）", reviewers[0].current_workload);

        println!("\n=== 多轮次编号与工作量联动测试通过 ✅ ===");
    }
}

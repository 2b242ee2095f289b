use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;

use product_review_assign::api::{AssignmentApi, ConfigApi, ReviewerApi};
use product_review_assign::app::get_default_db_path;
use product_review_assign::config::{config_keys, ConfigManager};
use product_review_assign::db::{ensure_schema, open_sqlite_connection};
use product_review_assign::domain::Product;
use product_review_assign::engine::OptionalNotifier;
use product_review_assign::repository::{
    AssignmentHistoryRepository, ProductRepository, ProductReviewRepository,
    ReviewRoundRepository, ReviewerRepository,
};

const DEMO_OPERATOR: &str = "seed";
const DEMO_ROUND_NAME: &str = "演示评审轮次";

fn demo_products() -> Vec<Product> {
    let rows = [
        ("P-1001", "质子治疗计划系统", "规划软件", "华仪医疗"),
        ("P-1002", "调强放疗计划模块", "规划软件", "瑞康科技"),
        ("P-1003", "剂量验证平台", "质控软件", "华仪医疗"),
        ("P-1004", "影像配准工具", "规划软件", "博信生物"),
        ("P-1005", "放射剂量监测仪", "质控软件", "瑞康科技"),
        ("P-1006", "术中导航系统", "导航设备", "华仪医疗"),
        ("P-1007", "超声引导定位仪", "导航设备", "博信生物"),
        ("P-1008", "放疗质控体模", "质控软件", "博信生物"),
        ("P-1009", "自适应放疗套件", "规划软件", "华仪医疗"),
        ("P-1010", "图像归档网关", "信息系统", "瑞康科技"),
    ];
    rows.iter()
        .map(|(id, name, category, company)| Product {
            product_id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            company: company.to_string(),
        })
        .collect()
}

/// (评审人ID, 姓名, 邮箱, 专长声明[(范围, 键, 优先级)])
fn demo_reviewers() -> Vec<(&'static str, &'static str, &'static str, Vec<(&'static str, &'static str, i32)>)>
{
    vec![
        (
            "rev-zhang",
            "张工",
            "zhang@example.com",
            vec![("CATEGORY", "规划软件", 1), ("COMPANY", "华仪医疗", 2)],
        ),
        (
            "rev-li",
            "李工",
            "li@example.com",
            vec![("CATEGORY", "质控软件", 1), ("CATEGORY", "规划软件", 2)],
        ),
        (
            "rev-wang",
            "王工",
            "wang@example.com",
            vec![("COMPANY", "瑞康科技", 1)],
        ),
        // 无专长声明,仅按工作量兜底分配
        ("rev-chen", "陈工", "chen@example.com", vec![]),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let product_repo = Arc::new(ProductRepository::new(conn.clone()));
    let reviewer_repo = Arc::new(ReviewerRepository::new(conn.clone()));
    let round_repo = Arc::new(ReviewRoundRepository::new(conn.clone()));
    let review_repo = Arc::new(ProductReviewRepository::new(conn.clone()));
    let history_repo = Arc::new(AssignmentHistoryRepository::new(conn.clone()));
    let config_manager = Arc::new(ConfigManager::from_connection(conn.clone())?);

    let reviewer_api = ReviewerApi::new(reviewer_repo.clone(), review_repo.clone());
    let config_api = ConfigApi::new(conn.clone());
    let assignment_api = AssignmentApi::new(
        product_repo.clone(),
        reviewer_repo.clone(),
        review_repo.clone(),
        round_repo.clone(),
        config_manager,
        OptionalNotifier::none(),
    );

    // 1. 产品目录
    let products = demo_products();
    for product in &products {
        product_repo.upsert(product)?;
    }
    println!("目录写入完成: {} 个产品", products.len());

    // 2. 评审人与专长声明
    let reviewers = demo_reviewers();
    for (id, name, email, expertise) in &reviewers {
        reviewer_api.create_reviewer(id, name, email)?;
        for (scope, key, priority) in expertise {
            reviewer_api.add_expertise(id, scope, key, *priority)?;
        }
    }
    println!("评审人登记完成: {} 人", reviewers.len());

    // 3. 全局配置
    config_api.update_config(config_keys::DEFAULT_DEADLINE_DAYS, "14", DEMO_OPERATOR)?;
    config_api.update_config(config_keys::NOTIFY_ENABLED, "off", DEMO_OPERATOR)?;

    // 4. 预览并提交一轮演示分配
    let product_ids: Vec<String> = products.iter().map(|p| p.product_id.clone()).collect();
    let reviewer_ids: Vec<String> = reviewers.iter().map(|(id, ..)| id.to_string()).collect();

    let preview = assignment_api.preview_assignments(&product_ids, &reviewer_ids)?;
    let committed = assignment_api
        .commit_assignments(&preview, DEMO_ROUND_NAME, None, DEMO_OPERATOR)
        .await?;
    println!(
        "轮次提交完成: round_no={} 评审行={}",
        committed.round_no, committed.review_count
    );

    // 5. 一次改派 + 一次取消分配,给审计流水留痕
    if let Some(first) = preview.assignments.first() {
        if let Some(other) = reviewer_ids.iter().find(|id| **id != first.reviewer_id) {
            assignment_api.reassign_product(
                &committed.round_id,
                &first.product_id,
                other,
                DEMO_OPERATOR,
                Some("演示改派".to_string()),
            )?;
        }
    }
    if let Some(second) = preview.assignments.get(1) {
        assignment_api.unassign_product(
            &committed.round_id,
            &second.product_id,
            DEMO_OPERATOR,
            Some("演示取消分配".to_string()),
        )?;
    }

    print_quick_counts(
        &product_repo,
        &reviewer_repo,
        &round_repo,
        &review_repo,
        &history_repo,
        &committed.round_id,
    )?;

    println!("数据库文件: {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn print_quick_counts(
    product_repo: &ProductRepository,
    reviewer_repo: &ReviewerRepository,
    round_repo: &ReviewRoundRepository,
    review_repo: &ProductReviewRepository,
    history_repo: &AssignmentHistoryRepository,
    round_id: &str,
) -> Result<(), Box<dyn Error>> {
    println!("---- 快速核对 ----");
    println!("目录产品数: {}", product_repo.count()?);
    println!("评审人数: {}", reviewer_repo.list_all()?.len());
    println!("评审轮次数: {}", round_repo.count()?);
    println!("轮内评审行: {}", review_repo.count_by_round(round_id)?);
    println!("审计记录数: {}", history_repo.count_by_round(round_id)?);
    Ok(())
}

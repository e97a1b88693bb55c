// ==========================================
// 商品目录批量导入系统 - 命令行入口
// ==========================================
// 用法:
//   catalog-import <db 路径> validate <文件> [strict|smart]
//   catalog-import <db 路径> commit <job_id> [--allow-partial]
//   catalog-import <db 路径> report <job_id> <输出文件>
//   catalog-import <db 路径> template <输出文件>
// ==========================================

use catalog_import::api::{ImportApi, Role, StaticRoleGuard};
use catalog_import::domain::types::ImportMode;
use catalog_import::logging;
use std::process::ExitCode;

fn usage() -> ExitCode {
    eprintln!("用法:");
    eprintln!("  catalog-import <db> validate <文件> [strict|smart]");
    eprintln!("  catalog-import <db> commit <job_id> [--allow-partial]");
    eprintln!("  catalog-import <db> report <job_id> <输出文件>");
    eprintln!("  catalog-import <db> template <输出文件>");
    ExitCode::from(2)
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        return usage();
    }
    let db_path = args[0].clone();
    let api = ImportApi::new(db_path, Box::new(StaticRoleGuard::new(Role::CatalogAdmin)));

    let result = match (args[1].as_str(), args.get(2), args.get(3)) {
        ("validate", Some(file), mode) => {
            let mode = mode
                .map(|m| ImportMode::parse(m))
                .unwrap_or(Some(ImportMode::Strict));
            let Some(mode) = mode else {
                return usage();
            };
            match std::fs::read(file) {
                Err(e) => Err(format!("读取文件失败: {}", e)),
                Ok(bytes) => match api.validate(&bytes, mode).await {
                    Ok(response) => {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&response).unwrap_or_default()
                        );
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                },
            }
        }
        ("commit", Some(job_id), flag) => {
            let allow_partial = flag.map(|f| f == "--allow-partial").unwrap_or(false);
            match api.commit(job_id, allow_partial).await {
                Ok(response) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&response).unwrap_or_default()
                    );
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            }
        }
        ("report", Some(job_id), Some(out_path)) => match api.report(job_id).await {
            Ok(bytes) => std::fs::write(out_path, bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        },
        ("template", Some(out_path), _) => match api.template().await {
            Ok(bytes) => std::fs::write(out_path, bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        },
        _ => return usage(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("错误: {}", message);
            ExitCode::FAILURE
        }
    }
}

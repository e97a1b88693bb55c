// ==========================================
// 商品目录批量导入系统 - 目录仓储 Trait
// ==========================================
// 职责: 定义目录存储的数据访问接口(upsert 键语义)
// 红线: Repository 不含业务规则,只按计划机械执行 CRUD
// ==========================================

use crate::domain::catalog::{Brand, Category, Product, Series, Variant};
use crate::domain::import::DbVerify;
use crate::domain::plan::{CreatedEntity, PlanApplication, UpsertPlan};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CatalogRepository Trait
// ==========================================
// 用途: 校验阶段的只读查询缓存构建 + 提交阶段的计划执行
// 实现者: CatalogRepositoryImpl(rusqlite)
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ===== 批量读取(解析上下文缓存构建) =====

    /// 读取全部类目(解析上下文按 (parent, slug) 建索引)
    async fn load_categories(&self) -> RepositoryResult<Vec<Category>>;

    /// 读取全部品牌
    async fn load_brands(&self) -> RepositoryResult<Vec<Brand>>;

    /// 读取全部系列
    async fn load_series(&self) -> RepositoryResult<Vec<Series>>;

    /// 读取商品键集合: (product_id, slug, title_primary)
    ///
    /// # 说明
    /// - title_primary 用于型号显示名的默认继承预测
    async fn load_product_keys(&self) -> RepositoryResult<Vec<(i64, String, String)>>;

    /// 读取型号键集合: (variant_id, model_code, product_id)
    ///
    /// # 说明
    /// - model_code 全局唯一,用于跨商品冲突检测
    async fn load_variant_keys(&self) -> RepositoryResult<Vec<(i64, String, i64)>>;

    // ===== 提交执行 =====

    /// 在单个事务内按依赖顺序执行 upsert 计划
    ///
    /// # 参数
    /// - plan: 依赖有序的 upsert 计划(Category → Brand → Series → Product → Variant)
    /// - allow_partial: true = 行级尽力而为,失败行记录后跳过;
    ///                  false = 任一行失败则整个事务回滚(返回 Err)
    ///
    /// # 返回
    /// - Ok(PlanApplication): 落库统计 + 声称创建的实体 + 行级失败
    /// - Err: 事务已回滚,零实体落库
    ///
    /// # 并发
    /// - 层级创建前对被扩展的父范围取 scope_lock 悲观锁,事务结束释放
    async fn apply_upsert_plan(
        &self,
        plan: &UpsertPlan,
        allow_partial: bool,
    ) -> RepositoryResult<PlanApplication>;

    /// 提交后验证: 对每个声称创建的实体重新查库确认持久化
    ///
    /// # 说明
    /// - 必须发起全新查询,不得复用内存对象
    /// - 任何缺失只记入 DbVerify,不报错
    async fn verify_created(&self, created: &[CreatedEntity]) -> RepositoryResult<DbVerify>;

    // ===== 单键查询(验证与测试用) =====

    /// 按 (parent_id, slug) 查类目
    async fn get_category(
        &self,
        parent_id: Option<i64>,
        slug: &str,
    ) -> RepositoryResult<Option<Category>>;

    /// 按 slug 查品牌
    async fn get_brand_by_slug(&self, slug: &str) -> RepositoryResult<Option<Brand>>;

    /// 按 (category_id, slug) 查系列(红线: 绝不提供按 slug 的全局查找)
    async fn get_series(
        &self,
        category_id: i64,
        slug: &str,
    ) -> RepositoryResult<Option<Series>>;

    /// 按 slug 查商品
    async fn get_product_by_slug(&self, slug: &str) -> RepositoryResult<Option<Product>>;

    /// 按 model_code 查型号
    async fn get_variant_by_model_code(
        &self,
        model_code: &str,
    ) -> RepositoryResult<Option<Variant>>;

    // ===== 统计 =====

    /// 各实体表记录数: (category, brand, series, product, variant)
    async fn entity_counts(&self) -> RepositoryResult<(usize, usize, usize, usize, usize)>;
}

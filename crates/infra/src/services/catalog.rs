use chrono::Utc;
use tracing::{info, instrument};

use bazaar_auth::{Principal, Role};
use bazaar_catalog::{
    Category, Metadata, MetadataDetail, MetadataFilter, MetadataUpdate, NewCategory, NewMetadata,
    NewSubcategory, Rating, Review, Subcategory,
};
use bazaar_core::{CategoryId, Page, PageRequest, ProductId, SubcategoryId};

use super::{ServiceError, ServiceResult, Services, require};

impl Services {
    #[instrument(skip(self, principal, input), err)]
    pub async fn create_category(
        &self,
        principal: &Principal,
        input: NewCategory,
    ) -> ServiceResult<Category> {
        require(principal, &[Role::OperationalGuy])?;
        let category = input.into_category(Utc::now())?;
        self.store.insert_category(&category).await?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.store.categories().await?)
    }

    pub async fn category(&self, id: CategoryId) -> ServiceResult<Category> {
        self.store
            .category(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("category"))
    }

    #[instrument(skip(self, principal, input), fields(category_id = %input.category_id), err)]
    pub async fn create_subcategory(
        &self,
        principal: &Principal,
        input: NewSubcategory,
    ) -> ServiceResult<Subcategory> {
        require(principal, &[Role::OperationalGuy])?;
        self.category(input.category_id).await?;
        let subcategory = input.into_subcategory(Utc::now())?;
        self.store.insert_subcategory(&subcategory).await?;
        info!(subcategory_id = %subcategory.id, "subcategory created");
        Ok(subcategory)
    }

    pub async fn subcategories(&self, category_id: CategoryId) -> ServiceResult<Vec<Subcategory>> {
        self.category(category_id).await?;
        Ok(self.store.subcategories(category_id).await?)
    }

    pub async fn subcategory(&self, id: SubcategoryId) -> ServiceResult<Subcategory> {
        self.store
            .subcategory(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subcategory"))
    }

    /// Create a catalog product together with its empty review totals.
    #[instrument(skip(self, principal, input), fields(hsn_code = %input.hsn_code), err)]
    pub async fn create_metadata(
        &self,
        principal: &Principal,
        input: NewMetadata,
    ) -> ServiceResult<MetadataDetail> {
        require(principal, &[Role::OperationalGuy, Role::Seller])?;
        let category = self.category(input.category_id).await?;
        let subcategory = self.subcategory(input.subcategory_id).await?;

        let metadata = input.into_metadata(&category, &subcategory, Utc::now())?;
        self.store.insert_metadata(&metadata).await?;
        info!(product_id = %metadata.product_id, "metadata created");

        let review = Review::empty(metadata.product_id);
        Ok(MetadataDetail::new(metadata, Some(&review)))
    }

    pub async fn metadata(&self, id: ProductId) -> ServiceResult<MetadataDetail> {
        let metadata = self
            .store
            .metadata(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("metadata"))?;
        let review = self.store.review(id).await?;
        Ok(MetadataDetail::new(metadata, review.as_ref()))
    }

    pub async fn list_metadata(
        &self,
        filter: MetadataFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Metadata>> {
        Ok(self.store.list_metadata(&filter, page).await?)
    }

    #[instrument(skip(self, principal, update), fields(product_id = %id), err)]
    pub async fn update_metadata(
        &self,
        principal: &Principal,
        id: ProductId,
        update: MetadataUpdate,
    ) -> ServiceResult<Metadata> {
        require(principal, &[Role::OperationalGuy, Role::Seller])?;
        update.validate()?;

        let mut metadata = self
            .store
            .metadata(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("metadata"))?;
        update.apply(&mut metadata, Utc::now());
        self.store.save_metadata(&metadata).await?;
        info!("metadata updated");
        Ok(metadata)
    }

    #[instrument(skip(self, principal), fields(product_id = %id), err)]
    pub async fn add_review(
        &self,
        principal: &Principal,
        id: ProductId,
        stars: i64,
    ) -> ServiceResult<Review> {
        require(principal, &[Role::Customer])?;
        let rating = Rating::new(stars)?;
        let review = self.store.add_review(id, rating).await?;
        info!(total_reviews = review.total_reviews, "review recorded");
        Ok(review)
    }
}

//! Offer-group resolution shared by response decoration and charting.

use futures::future::try_join_all;

use crate::error::Result;
use crate::ports::PathwayStore;
use crate::types::*;

/// The pathway's offer groups in iteration order, offers attached.
pub async fn load_offers_pathways(
    store: &dyn PathwayStore,
    pathway_id: PathwayId,
) -> Result<Vec<OfferGroup>> {
    store.load_offer_groups(pathway_id).await
}

/// Set `GroupsOfOffers` on an instance from the store.
pub async fn attach_offer_groups(
    store: &dyn PathwayStore,
    instance: &mut PathwayInstance,
) -> Result<()> {
    instance.groups_of_offers = Some(load_offers_pathways(store, instance.id()).await?);
    Ok(())
}

/// Attach offer groups to every instance, resolving them concurrently.
pub async fn attach_offer_groups_all(
    store: &dyn PathwayStore,
    instances: &mut [PathwayInstance],
) -> Result<()> {
    let resolved = try_join_all(
        instances
            .iter()
            .map(|instance| load_offers_pathways(store, instance.id())),
    )
    .await?;
    for (instance, groups) in instances.iter_mut().zip(resolved) {
        instance.groups_of_offers = Some(groups);
    }
    Ok(())
}

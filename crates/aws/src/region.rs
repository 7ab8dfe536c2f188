//! Region discovery
//!
//! Order: explicit override, `AWS_REGION`, `AWS_DEFAULT_REGION`, then the
//! EC2 instance metadata service.

use crate::AwsError;
use aws_config::imds::region::ImdsRegionProvider;
use aws_types::region::Region;

/// Environment variables consulted for the region, in order
pub const REGION_ENV_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Where the region came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    /// Explicit override (`--region`)
    Override,
    /// One of [`REGION_ENV_VARS`]
    Environment(&'static str),
    /// EC2 instance metadata
    InstanceMetadata,
}

/// Pick a region without touching the network.
///
/// `lookup` reads an environment variable; empty values count as unset.
pub fn region_from_env<F>(
    override_region: Option<&str>,
    lookup: F,
) -> Option<(String, RegionSource)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(region) = override_region.filter(|r| !r.is_empty()) {
        return Some((region.to_string(), RegionSource::Override));
    }

    REGION_ENV_VARS.into_iter().find_map(|var| {
        lookup(var)
            .filter(|value| !value.is_empty())
            .map(|value| (value, RegionSource::Environment(var)))
    })
}

/// Determine the region, falling back to instance metadata.
///
/// # Errors
///
/// Returns [`AwsError::NoRegion`] when neither the override, the environment
/// nor instance metadata provide a region.
pub async fn resolve_region(
    override_region: Option<&str>,
) -> Result<(Region, RegionSource), AwsError> {
    if let Some((region, source)) = region_from_env(override_region, |var| std::env::var(var).ok())
    {
        return Ok((Region::new(region), source));
    }

    tracing::debug!("No region in environment, querying EC2 instance metadata");
    ImdsRegionProvider::builder()
        .build()
        .region()
        .await
        .map(|region| (region, RegionSource::InstanceMetadata))
        .ok_or(AwsError::NoRegion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn override_wins() {
        let picked = region_from_env(Some("us-east-1"), env(&[("AWS_REGION", "eu-west-1")]));
        assert_eq!(
            picked,
            Some(("us-east-1".to_string(), RegionSource::Override))
        );
    }

    #[test]
    fn aws_region_before_default_region() {
        let picked = region_from_env(
            None,
            env(&[("AWS_REGION", "eu-north-1"), ("AWS_DEFAULT_REGION", "eu-west-1")]),
        );
        assert_eq!(
            picked,
            Some((
                "eu-north-1".to_string(),
                RegionSource::Environment("AWS_REGION")
            ))
        );
    }

    #[test]
    fn default_region_is_a_fallback() {
        let picked = region_from_env(None, env(&[("AWS_DEFAULT_REGION", "eu-west-1")]));
        assert_eq!(
            picked,
            Some((
                "eu-west-1".to_string(),
                RegionSource::Environment("AWS_DEFAULT_REGION")
            ))
        );
    }

    #[test]
    fn empty_values_are_ignored() {
        assert_eq!(region_from_env(Some(""), env(&[("AWS_REGION", "")])), None);
    }

    #[tokio::test]
    async fn resolve_region_reads_process_environment() {
        temp_env::async_with_vars(
            [
                ("AWS_REGION", None),
                ("AWS_DEFAULT_REGION", Some("ap-southeast-2")),
            ],
            async {
                let (region, source) = resolve_region(None).await.unwrap();
                assert_eq!(region.as_ref(), "ap-southeast-2");
                assert_eq!(source, RegionSource::Environment("AWS_DEFAULT_REGION"));
            },
        )
        .await;
    }
}

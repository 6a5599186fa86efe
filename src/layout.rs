// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Path and name conventions for a namespace's resources.
//!
//! The names here are shared with notebooks and jobs outside this
//! crate, so they must not change.

use crate::namespace::{self, Identity, Namespace};

/// The shared, read-only GeoIP database from which each namespace's
/// copy is staged.
pub const GEOIP_SOURCE: &str = "dbfs:/FileStore/dns_analytics/GeoLite2-City.mmdb";

/// The name of the query function for [`registered_domain_extract`].
///
/// [`registered_domain_extract`]: crate::extract::registered_domain_extract
pub const REGISTERED_DOMAIN_EXTRACT: &str = "registered_domain_extract";

/// The name of the query function for [`domain_extract`].
///
/// [`domain_extract`]: crate::extract::domain_extract
pub const DOMAIN_EXTRACT: &str = "domain_extract";

/// The name of the query function backed by the DGA model.
pub const IOC_DETECT: &str = "ioc_detect";

/// A local-disk dataset directory removed during cleanup. This path is
/// shared by all users rather than scoped by namespace.
pub const SHARED_DATASETS_DIR: &str = "file:/tmp/dns-notebook-datasets";

/// The session option enabled after the scratch database is selected.
pub const ARROW_CONF_KEY: &str = "spark.sql.execution.arrow.pyspark.enabled";

/// Every path and name derived for one user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    pub namespace: Namespace,
    pub scratch_path: String,
    pub database: String,
    pub geoip_staged: String,
    pub model_path: String,
    pub legacy_model_path: String,
    pub registered_model: String,
    pub experiment: String,
}

impl Layout {
    /// Computes the layout for `identity`.
    pub fn for_identity(identity: &Identity) -> Self {
        let namespace = identity.namespace();
        let scratch_path = namespace.default_path();
        Self {
            database: namespace.default_database(),
            geoip_staged: format!("dbfs:{}/datasets/GeoLite2_City.mmdb", scratch_path),
            model_path: format!("dbfs:{}/new_model/dga_model", scratch_path),
            legacy_model_path: format!("dbfs:{}/model", scratch_path),
            registered_model: namespace.registered_model_name(),
            experiment: namespace::experiment_name(identity),
            scratch_path,
            namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_conventions() {
        let layout = Layout::for_identity(&Identity::new("a.b+c@x.com"));
        assert_eq!(layout.namespace.as_str(), "a_b_c");
        assert_eq!(layout.scratch_path, "/tmp/a_b_c/dns_analytics");
        assert_eq!(layout.database, "a_b_c_dns");
        assert_eq!(
            layout.geoip_staged,
            "dbfs:/tmp/a_b_c/dns_analytics/datasets/GeoLite2_City.mmdb",
        );
        assert_eq!(
            layout.model_path,
            "dbfs:/tmp/a_b_c/dns_analytics/new_model/dga_model",
        );
        assert_eq!(layout.legacy_model_path, "dbfs:/tmp/a_b_c/dns_analytics/model");
        assert_eq!(layout.registered_model, "a_b_c_dns_dga");
        assert_eq!(
            layout.experiment,
            "/Users/a.b+c@x.com/dns_analytics_experiment",
        );
    }

    #[test]
    fn shared_datasets_dir_is_not_namespaced() {
        let alice = Layout::for_identity(&Identity::new("alice@example.com"));
        assert!(!SHARED_DATASETS_DIR.contains(alice.namespace.as_str()));
    }
}

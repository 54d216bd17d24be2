// The tile catalog — static template sets generation draws from.
//
// A `TileTemplate` declares a footprint (full 3D extents plus the local
// offset of the volume center) and an ordered list of connector slots,
// each a local position and the yaw its opening faces. Templates are
// grouped into four pools by role: start, normal, exit, blocker. The
// placement engine draws uniformly from a pool; blockers are drawn during
// cleanup to seal dead-end connectors.
//
// Catalogs are data: serde round-trippable JSON, loaded once at startup
// and immutable afterwards. Named preset constructors produce ready-made
// tile sets for embeddings that don't ship their own.
//
// See also: `geometry.rs` for how footprints and connector poses become
// world-space volumes, `generator.rs` for the drawing logic, `config.rs`
// for the run parameters that consume a catalog.

use crate::geometry::WorldVec;
use crate::types::TileKind;
use delve_prng::GenRng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use thiserror::Error;

/// A connector slot declared on a template: where the opening sits in the
/// tile's local frame and which way it faces. Yaw 0 faces +Z.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub position: WorldVec,
    pub yaw: f32,
}

/// An immutable tile template. `extents` is the full footprint size;
/// `bounds_center` is the local offset of the footprint's volume center
/// from the tile origin (tiles keep their origin on the floor, so this is
/// typically `(0, height/2, 0)`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileTemplate {
    pub name: String,
    pub kind: TileKind,
    pub extents: WorldVec,
    pub bounds_center: WorldVec,
    pub connectors: Vec<ConnectorSpec>,
}

/// A defect in a tile catalog, reported by [`TileCatalog::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog pool for {0:?} tiles is empty")]
    EmptyPool(TileKind),
    #[error("template {name:?} is in the {expected:?} pool but declares kind {found:?}")]
    KindMismatch {
        name: String,
        expected: TileKind,
        found: TileKind,
    },
    #[error("template {0:?} declares no connectors and can never be attached")]
    NoConnectors(String),
}

/// The four template pools generation draws from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileCatalog {
    pub start: Vec<TileTemplate>,
    pub normal: Vec<TileTemplate>,
    pub exit: Vec<TileTemplate>,
    pub blockers: Vec<TileTemplate>,
}

impl TileCatalog {
    /// Load a catalog from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the catalog to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Check the catalog for structural defects: empty pools, templates
    /// filed under the wrong pool, and attachable templates (start,
    /// normal, exit) without a single connector. Blockers are wall pieces
    /// and carry no connectors.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let pools: [(&[TileTemplate], TileKind); 4] = [
            (&self.start, TileKind::Start),
            (&self.normal, TileKind::Normal),
            (&self.exit, TileKind::Exit),
            (&self.blockers, TileKind::Blocker),
        ];
        for (pool, expected) in pools {
            if pool.is_empty() {
                return Err(CatalogError::EmptyPool(expected));
            }
            for template in pool {
                if template.kind != expected {
                    return Err(CatalogError::KindMismatch {
                        name: template.name.clone(),
                        expected,
                        found: template.kind,
                    });
                }
                if expected != TileKind::Blocker && template.connectors.is_empty() {
                    return Err(CatalogError::NoConnectors(template.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Draw a uniform random template from the start pool.
    pub fn random_start(&self, rng: &mut GenRng) -> &TileTemplate {
        &self.start[rng.pick_index(self.start.len())]
    }

    /// Draw a uniform random template from the normal pool.
    pub fn random_normal(&self, rng: &mut GenRng) -> &TileTemplate {
        &self.normal[rng.pick_index(self.normal.len())]
    }

    /// Draw a uniform random template from the exit pool.
    pub fn random_exit(&self, rng: &mut GenRng) -> &TileTemplate {
        &self.exit[rng.pick_index(self.exit.len())]
    }

    /// Draw a uniform random template from the blocker pool.
    pub fn random_blocker(&self, rng: &mut GenRng) -> &TileTemplate {
        &self.blockers[rng.pick_index(self.blockers.len())]
    }

    /// The standard dungeon set: generous halls and corridors with enough
    /// open connectors that most seeds complete without deep backtracking.
    pub fn standard() -> Self {
        Self {
            start: vec![TileTemplate {
                name: "entry_hall".into(),
                kind: TileKind::Start,
                extents: WorldVec::new(12.0, 5.0, 12.0),
                bounds_center: WorldVec::new(0.0, 2.5, 0.0),
                connectors: four_way(6.0),
            }],
            normal: vec![
                TileTemplate {
                    name: "great_hall".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(16.0, 6.0, 16.0),
                    bounds_center: WorldVec::new(0.0, 3.0, 0.0),
                    connectors: four_way(8.0),
                },
                TileTemplate {
                    name: "corridor".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(4.0, 4.0, 12.0),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: vec![
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, 6.0), yaw: 0.0 },
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, -6.0), yaw: PI },
                    ],
                },
                TileTemplate {
                    name: "corner_passage".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(4.0, 4.0, 4.0),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: vec![
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, -2.0), yaw: PI },
                        ConnectorSpec { position: WorldVec::new(2.0, 0.0, 0.0), yaw: FRAC_PI_2 },
                    ],
                },
                TileTemplate {
                    name: "small_chamber".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(8.0, 4.0, 8.0),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: vec![
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, 4.0), yaw: 0.0 },
                        ConnectorSpec { position: WorldVec::new(4.0, 0.0, 0.0), yaw: FRAC_PI_2 },
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, -4.0), yaw: PI },
                    ],
                },
            ],
            exit: vec![TileTemplate {
                name: "exit_stair".into(),
                kind: TileKind::Exit,
                extents: WorldVec::new(10.0, 6.0, 10.0),
                bounds_center: WorldVec::new(0.0, 3.0, 0.0),
                connectors: vec![ConnectorSpec {
                    position: WorldVec::new(0.0, 0.0, -5.0),
                    yaw: PI,
                }],
            }],
            blockers: vec![
                TileTemplate {
                    name: "sealed_arch".into(),
                    kind: TileKind::Blocker,
                    extents: WorldVec::new(4.0, 4.0, 0.5),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: Vec::new(),
                },
                TileTemplate {
                    name: "rubble_pile".into(),
                    kind: TileKind::Blocker,
                    extents: WorldVec::new(4.0, 3.0, 1.0),
                    bounds_center: WorldVec::new(0.0, 1.5, 0.0),
                    connectors: Vec::new(),
                },
            ],
        }
    }

    /// A cramped crypt set: narrow passages and chunky rooms that collide
    /// often, exercising the backtracking controller hard.
    pub fn catacombs() -> Self {
        Self {
            start: vec![TileTemplate {
                name: "burial_atrium".into(),
                kind: TileKind::Start,
                extents: WorldVec::new(10.0, 4.0, 10.0),
                bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                connectors: vec![
                    ConnectorSpec { position: WorldVec::new(0.0, 0.0, 5.0), yaw: 0.0 },
                    ConnectorSpec { position: WorldVec::new(5.0, 0.0, 0.0), yaw: FRAC_PI_2 },
                    ConnectorSpec { position: WorldVec::new(-5.0, 0.0, 0.0), yaw: 3.0 * FRAC_PI_2 },
                ],
            }],
            normal: vec![
                TileTemplate {
                    name: "crypt".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(10.0, 4.0, 10.0),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: four_way(5.0),
                },
                TileTemplate {
                    name: "ossuary_corridor".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(3.0, 3.0, 9.0),
                    bounds_center: WorldVec::new(0.0, 1.5, 0.0),
                    connectors: vec![
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, 4.5), yaw: 0.0 },
                        ConnectorSpec { position: WorldVec::new(0.0, 0.0, -4.5), yaw: PI },
                    ],
                },
                TileTemplate {
                    name: "shrine".into(),
                    kind: TileKind::Normal,
                    extents: WorldVec::new(6.0, 4.0, 6.0),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: vec![ConnectorSpec {
                        position: WorldVec::new(0.0, 0.0, -3.0),
                        yaw: PI,
                    }],
                },
            ],
            exit: vec![TileTemplate {
                name: "descending_vault".into(),
                kind: TileKind::Exit,
                extents: WorldVec::new(8.0, 5.0, 8.0),
                bounds_center: WorldVec::new(0.0, 2.5, 0.0),
                connectors: vec![ConnectorSpec {
                    position: WorldVec::new(0.0, 0.0, -4.0),
                    yaw: PI,
                }],
            }],
            blockers: vec![
                TileTemplate {
                    name: "bone_wall".into(),
                    kind: TileKind::Blocker,
                    extents: WorldVec::new(3.0, 3.0, 0.5),
                    bounds_center: WorldVec::new(0.0, 1.5, 0.0),
                    connectors: Vec::new(),
                },
                TileTemplate {
                    name: "collapsed_arch".into(),
                    kind: TileKind::Blocker,
                    extents: WorldVec::new(3.0, 4.0, 1.0),
                    bounds_center: WorldVec::new(0.0, 2.0, 0.0),
                    connectors: Vec::new(),
                },
            ],
        }
    }
}

/// Connectors at the floor midpoint of all four side faces, facing
/// outward. `half` is half the footprint width/depth.
fn four_way(half: f32) -> Vec<ConnectorSpec> {
    vec![
        ConnectorSpec { position: WorldVec::new(0.0, 0.0, half), yaw: 0.0 },
        ConnectorSpec { position: WorldVec::new(half, 0.0, 0.0), yaw: FRAC_PI_2 },
        ConnectorSpec { position: WorldVec::new(0.0, 0.0, -half), yaw: PI },
        ConnectorSpec { position: WorldVec::new(-half, 0.0, 0.0), yaw: 3.0 * FRAC_PI_2 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert_eq!(TileCatalog::standard().validate(), Ok(()));
        assert_eq!(TileCatalog::catacombs().validate(), Ok(()));
    }

    #[test]
    fn connectors_sit_on_footprint_boundary() {
        // Every attachable template's connectors must lie on the edge of
        // its footprint, or attached tiles would interpenetrate or float.
        let catalog = TileCatalog::standard();
        for template in catalog.start.iter().chain(&catalog.normal).chain(&catalog.exit) {
            let half_x = template.extents.x / 2.0;
            let half_z = template.extents.z / 2.0;
            for spec in &template.connectors {
                let on_x_face = (spec.position.x.abs() - half_x).abs() < 1e-4;
                let on_z_face = (spec.position.z.abs() - half_z).abs() < 1e-4;
                assert!(
                    on_x_face || on_z_face,
                    "{}: connector at {} is not on a face",
                    template.name,
                    spec.position
                );
            }
        }
    }

    #[test]
    fn validate_rejects_empty_pool() {
        let mut catalog = TileCatalog::standard();
        catalog.exit.clear();
        assert_eq!(catalog.validate(), Err(CatalogError::EmptyPool(TileKind::Exit)));
    }

    #[test]
    fn validate_rejects_misfiled_template() {
        let mut catalog = TileCatalog::standard();
        let stray = catalog.exit[0].clone();
        catalog.normal.push(stray);
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::KindMismatch { expected: TileKind::Normal, .. })
        ));
    }

    #[test]
    fn validate_rejects_connectorless_room() {
        let mut catalog = TileCatalog::standard();
        catalog.normal[0].connectors.clear();
        let name = catalog.normal[0].name.clone();
        assert_eq!(catalog.validate(), Err(CatalogError::NoConnectors(name)));
    }

    #[test]
    fn json_roundtrip() {
        let catalog = TileCatalog::catacombs();
        let json = catalog.to_json().unwrap();
        let restored = TileCatalog::from_json(&json).unwrap();
        assert_eq!(catalog, restored);
    }

    #[test]
    fn random_draws_stay_in_pool() {
        let catalog = TileCatalog::standard();
        let mut rng = GenRng::new(7);
        for _ in 0..100 {
            assert_eq!(catalog.random_normal(&mut rng).kind, TileKind::Normal);
            assert_eq!(catalog.random_blocker(&mut rng).kind, TileKind::Blocker);
        }
    }
}

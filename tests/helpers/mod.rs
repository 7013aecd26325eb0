//! Scripted Bungie.net platform for integration tests
//!
//! Answers by URL path with canned payloads and records every request.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use vault_breakdown::auth::{MemoryStore, TokenSession};
use vault_breakdown::config::AppConfig;
use vault_breakdown::gateway::{ApiRequest, ApiResponse, HttpTransport, LoginRouter};
use vault_breakdown::Result;

pub const MEMBERSHIP_ID: &str = "4611686018467284386";
pub const MEMBERSHIP_PATH: &str = "/Platform/User/GetMembershipsForCurrentUser/";
pub const PROFILE_PATH: &str = "/Platform/Destiny2/3/Profile/4611686018467284386/";
pub const MANIFEST_PATH: &str = "/Platform/Destiny2/Manifest/";
pub const TOKEN_PATH: &str = "/platform/app/oauth/token/";

pub const KINETIC: u32 = 1498876634;
pub const ENERGY: u32 = 2465295065;
pub const KINETIC_DAMAGE: u32 = 3373582085;
pub const SOLAR: u32 = 1847026933;
pub const ARC: u32 = 2303181850;
pub const INTRINSIC_SOCKET: u32 = 3956125808;

pub const ACE_OF_SPADES: u32 = 347366834;
pub const BLAST_FURNACE: u32 = 3211806999;
pub const CHROMA_RUSH: u32 = 1119734784;
pub const PRECISION_FRAME: u32 = 1294026524;
pub const RAPID_FIRE_FRAME: u32 = 878286503;

const TABLES: [&str; 6] = [
    "DestinyInventoryItemDefinition",
    "DestinyInventoryBucketDefinition",
    "DestinyDamageTypeDefinition",
    "DestinySandboxPerkDefinition",
    "DestinyStatDefinition",
    "DestinyItemCategoryDefinition",
];

#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: String,
    pub path: String,
    pub authorization: Option<String>,
    pub api_key: Option<String>,
    pub body: Option<String>,
}

#[derive(Default)]
pub struct FakeBungie {
    routes: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeBungie {
    /// Platform serving a complete account, manifest and definition tables
    pub fn populated() -> Arc<Self> {
        let fake = Arc::new(Self::default());
        fake.respond(MEMBERSHIP_PATH, 200, envelope(membership()));
        fake.respond(PROFILE_PATH, 200, envelope(profile()));
        fake.respond(MANIFEST_PATH, 200, envelope(manifest()));
        for (table, body) in tables() {
            fake.respond(&table_path(table), 200, body);
        }
        fake
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for FakeBungie {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.full_url()?;
        self.requests.lock().unwrap().push(Recorded {
            url: url.to_string(),
            path: url.path().to_string(),
            authorization: request.header_value("Authorization").map(str::to_string),
            api_key: request.header_value("X-API-Key").map(str::to_string),
            body: request.body.clone(),
        });

        let routes = self.routes.lock().unwrap();
        Ok(match routes.get(url.path()) {
            Some((status, body)) => ApiResponse::new(*status, body.clone()),
            None => ApiResponse::new(404, "{}"),
        })
    }
}

/// Counts login redirects
#[derive(Default)]
pub struct RecordingRouter {
    redirects: Mutex<usize>,
}

impl RecordingRouter {
    pub fn redirects(&self) -> usize {
        *self.redirects.lock().unwrap()
    }
}

impl LoginRouter for RecordingRouter {
    fn route_to_login(&self) {
        *self.redirects.lock().unwrap() += 1;
    }
}

pub fn config() -> AppConfig {
    AppConfig::from_yaml(
        r#"
api_key: "test-api-key"
oauth_client_id: "12345"
"#,
    )
    .unwrap()
}

pub fn logged_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let session = TokenSession {
        access_token: "CKWsBBKGAgAg".to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        membership_id: "14759286".to_string(),
        issued_at: chrono::Utc::now(),
    };
    vault_breakdown::auth::KeyValueStore::set(
        store.as_ref(),
        vault_breakdown::auth::SESSION_KEY,
        &serde_json::to_string(&session).unwrap(),
    )
    .unwrap();
    store
}

// =============================================================================
// Payloads
// =============================================================================

pub fn envelope(response: Value) -> Value {
    json!({
        "Response": response,
        "ErrorCode": 1,
        "ThrottleSeconds": 0,
        "ErrorStatus": "Success",
        "Message": "Ok",
        "MessageData": {}
    })
}

pub fn table_path(table: &str) -> String {
    format!("/common/destiny2_content/json/en/{}-test.json", table)
}

fn membership() -> Value {
    json!({
        "destinyMemberships": [
            {"membershipId": MEMBERSHIP_ID, "membershipType": 3, "displayName": "Guardian"}
        ],
        "primaryMembershipId": MEMBERSHIP_ID
    })
}

fn entry(hash: u32, instance: &str) -> Value {
    json!({"itemHash": hash, "itemInstanceId": instance, "quantity": 1, "bucketHash": 138197802u32})
}

fn instance(power: i32) -> Value {
    json!({"primaryStat": {"statHash": 1480404414u32, "value": power}, "itemLevel": 0, "isEquipped": false})
}

fn profile() -> Value {
    json!({
        "profileInventory": {"data": {"items": [
            entry(BLAST_FURNACE, "6917529001"),
            entry(ACE_OF_SPADES, "6917529002"),
            entry(BLAST_FURNACE, "6917529003")
        ]}},
        "characterInventories": {"data": {
            "2305843009301234567": {"items": [entry(CHROMA_RUSH, "6917529004")]}
        }},
        "characterEquipment": {"data": {
            "2305843009301234567": {"items": [entry(ACE_OF_SPADES, "6917529005")]}
        }},
        "itemComponents": {
            "instances": {"data": {
                "6917529001": instance(1790),
                "6917529002": instance(1810),
                "6917529003": instance(1805),
                "6917529004": instance(1800),
                "6917529005": instance(1780)
            }},
            "perks": {"data": {
                "6917529002": {"perks": [{"perkHash": 1428297954u32, "isActive": true, "visible": true}]}
            }},
            "stats": {"data": {}}
        }
    })
}

fn manifest() -> Value {
    let paths: serde_json::Map<String, Value> = TABLES
        .iter()
        .map(|t| (t.to_string(), json!(table_path(t))))
        .collect();
    json!({
        "version": "226451.24.03.01.1730-1",
        "jsonWorldComponentContentPaths": {"en": paths}
    })
}

fn weapon(
    hash: u32,
    name: &str,
    bucket: u32,
    damage: u32,
    sub_type: i32,
    tier: i32,
    frame: u32,
) -> Value {
    json!({
        "hash": hash,
        "displayProperties": {"name": name},
        "itemType": 3,
        "itemSubType": sub_type,
        "inventory": {"bucketTypeHash": bucket, "tierType": tier},
        "defaultDamageTypeHash": damage,
        "sockets": {"socketEntries": [
            {"socketTypeHash": INTRINSIC_SOCKET, "singleInitialItemHash": frame}
        ]}
    })
}

fn named(hash: u32, name: &str) -> Value {
    json!({"hash": hash, "displayProperties": {"name": name}})
}

fn tables() -> Vec<(&'static str, Value)> {
    vec![
        (
            TABLES[0],
            json!({
                ACE_OF_SPADES.to_string(): weapon(ACE_OF_SPADES, "Ace of Spades", KINETIC, KINETIC_DAMAGE, 6, 6, PRECISION_FRAME),
                BLAST_FURNACE.to_string(): weapon(BLAST_FURNACE, "Blast Furnace", ENERGY, SOLAR, 13, 5, RAPID_FIRE_FRAME),
                CHROMA_RUSH.to_string(): weapon(CHROMA_RUSH, "Chroma Rush", ENERGY, ARC, 6, 5, RAPID_FIRE_FRAME),
                PRECISION_FRAME.to_string(): named(PRECISION_FRAME, "Precision Frame"),
                RAPID_FIRE_FRAME.to_string(): named(RAPID_FIRE_FRAME, "Rapid-Fire Frame")
            }),
        ),
        (
            TABLES[1],
            json!({
                KINETIC.to_string(): named(KINETIC, "Kinetic Weapons"),
                ENERGY.to_string(): named(ENERGY, "Energy Weapons")
            }),
        ),
        (
            TABLES[2],
            json!({
                KINETIC_DAMAGE.to_string(): named(KINETIC_DAMAGE, "Kinetic"),
                SOLAR.to_string(): named(SOLAR, "Solar")
            }),
        ),
        (TABLES[3], json!({})),
        (TABLES[4], json!({})),
        (
            TABLES[5],
            json!({
                "6": {"hash": 6, "displayProperties": {"name": "Hand Cannon"}, "grantDestinyItemType": 3, "grantDestinySubType": 6},
                "13": {"hash": 13, "displayProperties": {"name": "Pulse Rifle"}, "grantDestinyItemType": 3, "grantDestinySubType": 13}
            }),
        ),
    ]
}

//! Read access to the academy records the boards are used alongside.

use super::{AcademyPortalClient, Result, send_graphql};
use crate::attendance::{AttendanceRecord, AttendanceStatus};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use time::OffsetDateTime;

const ME: &str = "query Me { me { id name email role schoolId } }";

const CATEGORIES: &str = "query Categories {
  categories { id name ageGroup coaches { id name email phone } }
}";

const PLAYERS: &str = "query Players($categoryId: ID) {
  players(categoryId: $categoryId) {
    id firstName lastName categoryId jerseyNumber guardian { id name email phone }
  }
}";

const SESSIONS: &str = "query Sessions($categoryId: ID) {
  sessions(categoryId: $categoryId) { id categoryId startsAt location topic }
}";

const MATCHES: &str = "query Matches($categoryId: ID) {
  matches(categoryId: $categoryId) { id categoryId opponent startsAt isHome goalsFor goalsAgainst }
}";

const NOTICES: &str = "query Notices { notices { id title body audience publishedAt } }";

const SESSION_ATTENDANCE: &str = "query SessionAttendance($sessionId: ID!) {
  sessionAttendance(sessionId: $sessionId) { playerId status }
}";

const MARK_ATTENDANCE: &str =
    "mutation MarkAttendance($sessionId: ID!, $playerId: ID!, $status: AttendanceStatus!) {
  markAttendance(sessionId: $sessionId, playerId: $playerId, status: $status) { playerId status }
}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Superadmin,
    Director,
    Coach,
    Guardian,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Superadmin => write!(f, "Superadmin"),
            Self::Director => write!(f, "Director"),
            Self::Coach => write!(f, "Coach"),
            Self::Guardian => write!(f, "Guardian"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub school_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub type Coach = Contact;
pub type Guardian = Contact;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub age_group: Option<String>,
    #[serde(default)]
    pub coaches: Vec<Coach>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub category_id: Option<String>,
    pub jersey_number: Option<u16>,
    pub guardian: Option<Guardian>,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub category_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    pub location: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub category_id: Option<String>,
    pub opponent: String,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    pub is_home: bool,
    pub goals_for: Option<u8>,
    pub goals_against: Option<u8>,
}

impl Match {
    pub fn is_played(&self) -> bool {
        self.goals_for.is_some() && self.goals_against.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub title: String,
    pub body: String,
    /// `None` means everyone in the school
    pub audience: Option<Role>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

impl Notice {
    pub fn is_for(&self, role: Role) -> bool {
        self.audience.is_none_or(|audience| audience == role)
    }
}

#[derive(Debug, Deserialize)]
struct MeData {
    me: User,
}

#[derive(Debug, Deserialize)]
struct CategoriesData {
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct PlayersData {
    players: Vec<Player>,
}

#[derive(Debug, Deserialize)]
struct SessionsData {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct MatchesData {
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct NoticesData {
    notices: Vec<Notice>,
}

#[derive(Debug, Deserialize)]
struct AttendanceData {
    #[serde(rename = "sessionAttendance")]
    records: Vec<AttendanceRecord>,
}

#[derive(Debug, Deserialize)]
struct MarkData {
    #[serde(rename = "markAttendance")]
    record: AttendanceRecord,
}

impl AcademyPortalClient {
    pub fn me(&self) -> impl std::future::Future<Output = Result<User>> + use<> {
        let request = self.graphql_request(ME, json!({}));
        async move { Ok(send_graphql::<MeData>(request, "me").await?.me) }
    }

    pub fn categories(&self) -> impl std::future::Future<Output = Result<Vec<Category>>> + use<> {
        let request = self.graphql_request(CATEGORIES, json!({}));
        async move {
            Ok(send_graphql::<CategoriesData>(request, "categories")
                .await?
                .categories)
        }
    }

    pub fn players(
        &self,
        category_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<Player>>> + use<> {
        let request = self.graphql_request(PLAYERS, json!({ "categoryId": category_id }));
        async move { Ok(send_graphql::<PlayersData>(request, "players").await?.players) }
    }

    pub fn sessions(
        &self,
        category_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<Session>>> + use<> {
        let request = self.graphql_request(SESSIONS, json!({ "categoryId": category_id }));
        async move { Ok(send_graphql::<SessionsData>(request, "sessions").await?.sessions) }
    }

    pub fn matches(
        &self,
        category_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<Match>>> + use<> {
        let request = self.graphql_request(MATCHES, json!({ "categoryId": category_id }));
        async move { Ok(send_graphql::<MatchesData>(request, "matches").await?.matches) }
    }

    pub fn notices(&self) -> impl std::future::Future<Output = Result<Vec<Notice>>> + use<> {
        let request = self.graphql_request(NOTICES, json!({}));
        async move { Ok(send_graphql::<NoticesData>(request, "notices").await?.notices) }
    }

    pub fn session_attendance(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<AttendanceRecord>>> + use<> {
        let request = self.graphql_request(SESSION_ATTENDANCE, json!({ "sessionId": session_id }));
        async move {
            Ok(send_graphql::<AttendanceData>(request, "sessionAttendance")
                .await?
                .records)
        }
    }

    pub fn mark_attendance(
        &self,
        session_id: &str,
        player_id: &str,
        status: AttendanceStatus,
    ) -> impl std::future::Future<Output = Result<AttendanceRecord>> + use<> {
        let request = self.graphql_request(
            MARK_ATTENDANCE,
            json!({ "sessionId": session_id, "playerId": player_id, "status": status }),
        );
        async move {
            Ok(send_graphql::<MarkData>(request, "markAttendance")
                .await?
                .record)
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::{parse_graphql_response, test::request_body, test::test_client};
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), r#""SUPERADMIN""#);
        let role: Role = serde_json::from_str(r#""GUARDIAN""#).unwrap();
        assert_eq!(role, Role::Guardian);
        assert_eq!(enum_iterator::all::<Role>().count(), 4);
    }

    #[test]
    fn test_parse_players() {
        let body = r#"{"data":{"players":[
            {"id":"p1","firstName":"Ana","lastName":"Diaz","categoryId":"u12","jerseyNumber":9,
             "guardian":{"id":"g1","name":"Luis Diaz","email":null,"phone":"555"}},
            {"id":"p2","firstName":"Ben","lastName":"Ode","categoryId":null,"jerseyNumber":null,"guardian":null}
        ]}}"#;
        let data: PlayersData = parse_graphql_response(body, "players").unwrap();
        assert_eq!(data.players.len(), 2);
        assert_eq!(data.players[0].full_name(), "Ana Diaz");
        assert_eq!(data.players[0].guardian.as_ref().unwrap().phone.as_deref(), Some("555"));
        assert_eq!(data.players[1].jersey_number, None);
    }

    #[test]
    fn test_parse_sessions_and_matches() {
        let body = r#"{"data":{"sessions":[
            {"id":"s1","categoryId":"u12","startsAt":"2026-10-20T17:30:00Z","location":"Pitch 2","topic":null}
        ]}}"#;
        let data: SessionsData = parse_graphql_response(body, "sessions").unwrap();
        assert_eq!(data.sessions[0].starts_at, datetime!(2026-10-20 17:30:00 UTC));

        let body = r#"{"data":{"matches":[
            {"id":"m1","categoryId":"u12","opponent":"Rovers","startsAt":"2026-10-25T10:00:00Z",
             "isHome":true,"goalsFor":2,"goalsAgainst":1},
            {"id":"m2","categoryId":"u12","opponent":"City","startsAt":"2026-11-01T10:00:00Z",
             "isHome":false,"goalsFor":null,"goalsAgainst":null}
        ]}}"#;
        let data: MatchesData = parse_graphql_response(body, "matches").unwrap();
        assert!(data.matches[0].is_played());
        assert!(!data.matches[1].is_played());
    }

    #[test]
    fn test_notice_audience() {
        let body = r#"{"data":{"notices":[
            {"id":"n1","title":"Kit day","body":"Bring boots","audience":null,"publishedAt":"2026-10-01T08:00:00Z"},
            {"id":"n2","title":"Coach meeting","body":"Room 4","audience":"COACH","publishedAt":"2026-10-02T08:00:00Z"}
        ]}}"#;
        let data: NoticesData = parse_graphql_response(body, "notices").unwrap();
        assert!(data.notices[0].is_for(Role::Guardian));
        assert!(data.notices[1].is_for(Role::Coach));
        assert!(!data.notices[1].is_for(Role::Guardian));
    }

    #[test]
    fn test_mark_attendance_body() {
        let client = test_client(Some("tok"));
        let body = request_body(client.graphql_request(
            MARK_ATTENDANCE,
            json!({ "sessionId": "s1", "playerId": "p1", "status": AttendanceStatus::Late }),
        ));
        assert_eq!(body["variables"]["status"], "LATE");
        assert_eq!(body["variables"]["playerId"], "p1");
    }
}

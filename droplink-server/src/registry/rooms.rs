use dashmap::DashMap;
use droplink_core::{ProtocolError, RoomId, RoomSummary, RoomVisibility, UserId};
use std::time::Instant;
use tracing::info;

pub const DEFAULT_ROOM_CAPACITY: usize = 5;

/// A live room: display metadata plus the ordered member list. Member order
/// is join order, which downstream drives the offer-initiator assignment.
#[derive(Debug)]
pub struct Room {
    pub name: String,
    pub genre: String,
    pub visibility: RoomVisibility,
    pub capacity: usize,
    pub members: Vec<UserId>,
    created_at: Instant,
}

#[derive(Debug, Clone)]
struct Membership {
    room_id: RoomId,
    display_name: String,
}

/// Result of a successful join: the fresh identity plus the members that
/// were already present (the `new-member` fan-out audience).
#[derive(Debug)]
pub struct JoinOutcome {
    pub user_id: UserId,
    pub prior_members: Vec<UserId>,
}

/// Room membership state and mutation policy: capacity enforcement,
/// join-order bookkeeping, empty-room cleanup, public-room search.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    memberships: DashMap<UserId, Membership>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&self, name: String, genre: String, visibility: RoomVisibility) -> RoomId {
        let room_id = RoomId::new();
        self.rooms.insert(
            room_id,
            Room {
                name,
                genre,
                visibility,
                capacity: DEFAULT_ROOM_CAPACITY,
                members: Vec::new(),
                created_at: Instant::now(),
            },
        );
        info!("room {room_id} created");
        room_id
    }

    /// Join a room under its entry guard, so the capacity check and the
    /// member append are one atomic step: concurrent joiners serialize and
    /// `|members| <= capacity` can never be violated. No I/O in here.
    pub fn join(&self, room_id: RoomId, display_name: String) -> Result<JoinOutcome, ProtocolError> {
        let mut room = self.rooms.get_mut(&room_id).ok_or(ProtocolError::RoomNotFound)?;

        if room.members.len() == room.capacity {
            return Err(ProtocolError::RoomFull);
        }

        let user_id = UserId::new();
        let prior_members = room.members.clone();
        room.members.push(user_id);

        self.memberships.insert(
            user_id,
            Membership {
                room_id,
                display_name,
            },
        );

        Ok(JoinOutcome {
            user_id,
            prior_members,
        })
    }

    /// Remove a user from its room, deleting the room the moment its member
    /// list empties. Returns the remaining co-members for notification.
    /// Idempotent: a user without a membership yields an empty vec.
    pub fn leave(&self, user_id: &UserId) -> Vec<UserId> {
        let Some((_, membership)) = self.memberships.remove(user_id) else {
            return Vec::new();
        };
        info!(
            "{} ({user_id}) left room {}",
            membership.display_name, membership.room_id
        );

        let Some(mut room) = self.rooms.get_mut(&membership.room_id) else {
            return Vec::new();
        };

        room.members.retain(|member| member != user_id);
        let remaining = room.members.clone();
        let now_empty = remaining.is_empty();
        drop(room);

        if now_empty {
            self.rooms.remove(&membership.room_id);
            info!("room {} deleted (last member left)", membership.room_id);
        }

        remaining
    }

    pub fn room_of(&self, user_id: &UserId) -> Option<RoomId> {
        self.memberships.get(user_id).map(|entry| entry.room_id)
    }

    /// Every other member of the user's room, or `None` if the user has no
    /// room.
    pub fn co_members(&self, user_id: &UserId) -> Option<Vec<UserId>> {
        let room_id = self.room_of(user_id)?;
        let room = self.rooms.get(&room_id)?;
        Some(
            room.members
                .iter()
                .filter(|member| *member != user_id)
                .copied()
                .collect(),
        )
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Public rooms whose name contains the query, case-insensitively.
    /// Empty query matches everything. Most recently created first.
    pub fn list_public(&self, query: &str) -> Vec<RoomSummary> {
        let needle = query.to_lowercase();
        let mut matches: Vec<(Instant, RoomSummary)> = self
            .rooms
            .iter()
            .filter(|entry| entry.visibility == RoomVisibility::Public)
            .filter(|entry| needle.is_empty() || entry.name.to_lowercase().contains(&needle))
            .map(|entry| {
                (
                    entry.created_at,
                    RoomSummary {
                        room_id: *entry.key(),
                        room_name: entry.name.clone(),
                        genre: entry.genre.clone(),
                        member_count: entry.members.len(),
                        capacity: entry.capacity,
                    },
                )
            })
            .collect();

        matches.sort_by(|a, b| b.0.cmp(&a.0));
        matches.into_iter().map(|(_, summary)| summary).collect()
    }
}

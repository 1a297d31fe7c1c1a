//! Domain models and request/response payloads

pub mod chat;
pub mod participant;
pub mod review;
pub mod trip;
pub mod user;

// Re-export for convenience
pub use chat::{ChatRoom, Message, MessageView, SendMessageRequest};
pub use participant::{
    JoinDecision, ParticipantStatus, ParticipantView, ResolveRequest, TripParticipant,
};
pub use review::{NewReview, Review, ReviewRecord, ReviewTarget, SubmitReviewRequest, TripRole};
pub use trip::{
    CreateTripRequest, DestinationSummary, JoinedTrip, LooseNumber, NewTrip, Trip, TripDetails,
    TripListing, TripSearch, TripSearchQuery, TripSort, start_of_day_utc,
};
pub use user::{
    Account, EnsureProfileRequest, NewUser, Profile, TravelStyle, UpdateProfileRequest, User,
};

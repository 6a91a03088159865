mod call_service;
mod group_service;
mod message_service;
mod reaction_service;
mod receipt_service;
mod user_service;

pub use call_service::{
    AcceptCallRequest, CallService, CallServiceDependencies, InitiateCallRequest,
    TerminateCallRequest,
};
pub use group_service::{
    AddMembersRequest, CreateGroupRequest, DeleteGroupRequest, GroupService,
    GroupServiceDependencies, LeaveGroupRequest, RemoveMemberRequest, UpdateGroupRequest,
};
pub use message_service::{
    ClearChatRequest, DeleteMessageRequest, DeleteMode, HistoryRequest, MessageService,
    MessageServiceDependencies, SendGroupRequest, SendOutcome, SendPrivateRequest,
};
pub use reaction_service::{ReactionService, ReactionServiceDependencies, SetReactionRequest};
pub use receipt_service::{MarkReadRequest, ReceiptService, ReceiptServiceDependencies};
pub use user_service::{
    AuthenticateUserRequest, RegisterUserRequest, RequestFollowRequest, RespondFollowRequest,
    UnfriendRequest, UpdateProfileRequest, UserService, UserServiceDependencies,
};

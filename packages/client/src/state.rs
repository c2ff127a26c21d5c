//! Connection lifecycle state machine.
//!
//! One `ConnectionState` value lives for one connect lifetime:
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingHandshake -> Ready -> {Sending, Listening}* -> Closing -> Closed
//! ```
//!
//! `Closed` is terminal. Reconnecting starts a new lifetime from `Disconnected`.

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingHandshake,
    Ready,
    Sending,
    Listening,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, to),
            (Disconnected, Connecting)
                | (Connecting, AwaitingHandshake)
                | (Connecting, Closed)
                | (AwaitingHandshake, Ready)
                | (AwaitingHandshake, Closed)
                | (Ready, Sending)
                | (Ready, Closing)
                | (Sending, Listening)
                | (Sending, Ready)
                | (Sending, Closing)
                | (Listening, Ready)
                | (Listening, Closing)
                | (Closing, Closed)
        )
    }

    /// Move to `to`, or fail with `InvalidState` if the edge does not exist.
    pub fn transition(self, to: ConnectionState) -> Result<ConnectionState, ClientError> {
        if self.can_transition_to(to) {
            tracing::debug!("Connection state: {:?} -> {:?}", self, to);
            Ok(to)
        } else {
            Err(ClientError::InvalidState { from: self, to })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_full_lifecycle_is_accepted() {
        // テスト項目: 接続から切断までの正常な遷移が全て許可される
        // given (前提条件):
        let path = [
            Disconnected,
            Connecting,
            AwaitingHandshake,
            Ready,
            Sending,
            Listening,
            Ready,
            Sending,
            Listening,
            Ready,
            Closing,
            Closed,
        ];

        // when (操作):
        let result = path
            .windows(2)
            .try_fold(path[0], |state, pair| {
                assert_eq!(state, pair[0]);
                state.transition(pair[1])
            });

        // then (期待する結果):
        assert_eq!(result.unwrap(), Closed);
    }

    #[test]
    fn test_handshake_failure_goes_to_closed() {
        // テスト項目: ハンドシェイク失敗時は AwaitingHandshake から Closed へ遷移できる
        // given (前提条件):
        let state = AwaitingHandshake;

        // when (操作):
        let result = state.transition(Closed);

        // then (期待する結果):
        assert_eq!(result.unwrap(), Closed);
    }

    #[test]
    fn test_closed_is_terminal() {
        // テスト項目: Closed からはどの状態にも遷移できない
        // given (前提条件):
        let state = Closed;

        // when (操作):
        let any_allowed = [
            Disconnected,
            Connecting,
            AwaitingHandshake,
            Ready,
            Sending,
            Listening,
            Closing,
            Closed,
        ]
        .into_iter()
        .any(|to| state.can_transition_to(to));

        // then (期待する結果):
        assert!(state.is_terminal());
        assert!(!any_allowed);
    }

    #[test]
    fn test_cannot_send_before_handshake() {
        // テスト項目: ハンドシェイク前に Sending へは遷移できない
        // given (前提条件):
        let state = AwaitingHandshake;

        // when (操作):
        let result = state.transition(Sending);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ClientError::InvalidState {
                from: AwaitingHandshake,
                to: Sending
            })
        ));
    }

    #[test]
    fn test_failed_send_returns_to_ready() {
        // テスト項目: 送信失敗時は Sending から Ready に戻れる
        // given (前提条件):
        let state = Sending;

        // when (操作):
        let result = state.transition(Ready);

        // then (期待する結果):
        assert_eq!(result.unwrap(), Ready);
    }
}

mod test_candidate_without_session_dropped;

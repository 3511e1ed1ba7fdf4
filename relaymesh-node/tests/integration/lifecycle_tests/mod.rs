mod test_close_follows_open;
mod test_stale_events_ignored;

use benchdriver::error::AppResult;

fn main() -> AppResult<()> {
    benchdriver::entry::run()
}

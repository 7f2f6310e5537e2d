mod cli;

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use flat_fs::{BLOCK_SIZE, FcbKind, FlatFileSystem};
use flat_fs_fuse::BlockFile;

use self::cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Format { size } => {
            let dev = Arc::new(BlockFile::create(&cli.image, size.0).map_err(io::Error::other)?);
            let fs = FlatFileSystem::format(dev, size.0 as usize / BLOCK_SIZE)
                .map_err(io::Error::other)?;

            let sb = fs.super_block();
            println!(
                "formatted {}: {} blocks, {} free",
                cli.image.display(),
                sb.total_blocks,
                sb.free_blocks
            );
            fs.close();
        }
        Command::Mkdir { name } => {
            let mut fs = open_fs(&cli.image)?;
            fs.make_dir(&name).map_err(io::Error::other)?;
            fs.close();
        }
        Command::Touch { name } => {
            let mut fs = open_fs(&cli.image)?;
            fs.create_file(&name).map_err(io::Error::other)?;
            fs.close();
        }
        Command::Append { name, text } => {
            let mut fs = open_fs(&cli.image)?;
            fs.append(&name, text.as_bytes()).map_err(io::Error::other)?;
            fs.close();
        }
        Command::Ls => {
            let fs = open_fs(&cli.image)?;
            for entry in fs.read_dir() {
                let kind = match entry.kind {
                    FcbKind::Directory => 'd',
                    _ => '-',
                };
                println!("{kind} {:>8} {}", entry.size, entry.name);
            }
        }
        Command::Info => {
            let fs = open_fs(&cli.image)?;
            let sb = fs.super_block();
            println!("total blocks: {}", sb.total_blocks);
            println!("free blocks:  {}", sb.free_blocks);
            println!("root fcb:     {}", sb.root_fcb);
            println!("bitmap start: {}", sb.bitmap_start);
            println!("fat start:    {}", sb.fat_start);
            // the fcb region start is not stored on disk, only derived
            println!("fcb start:    {}", fs.regions().fcb_start);
            println!("data start:   {}", sb.data_start);
        }
    }

    Ok(())
}

fn open_fs(image: &Path) -> io::Result<FlatFileSystem> {
    let dev = Arc::new(BlockFile::open(image).map_err(io::Error::other)?);
    Ok(FlatFileSystem::open(dev))
}
